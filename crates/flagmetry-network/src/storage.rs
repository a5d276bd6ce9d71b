//! 메트릭 카운트 저장소.
//!
//! 플래그 평가를 분 단위 버킷으로 모아 두고, 리포터가 주기마다 통째로 꺼내 간다.

use flagmetry_core::models::metric::{bucket_timestamp, Metric, MetricCounts};
use parking_lot::Mutex;
use tracing::debug;

/// 스레드 안전 메트릭 저장소
#[derive(Debug, Default)]
pub struct MetricStorage {
    counts: Mutex<MetricCounts>,
}

impl MetricStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 시각 버킷에 평가 1건 기록
    pub fn record(&self, name: &str, result: bool) {
        self.record_at(name, result, chrono::Utc::now().timestamp());
    }

    /// 지정 시각 버킷에 평가 1건 기록
    ///
    /// 같은 분 안의 타임스탬프는 하나의 키로 합산된다.
    pub fn record_at(&self, name: &str, result: bool, timestamp: i64) {
        let metric = Metric::new(name, result, bucket_timestamp(timestamp));
        self.counts.lock().increment(metric, 1);
    }

    /// 메트릭 카운트 증가 (타임스탬프 그대로 사용)
    pub fn increment(&self, metric: Metric, by: u64) -> u64 {
        self.counts.lock().increment(metric, by)
    }

    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }

    /// 누적 카운트를 모두 꺼내고 비운다
    pub fn drain(&self) -> MetricCounts {
        std::mem::take(&mut *self.counts.lock())
    }

    /// 꺼낸 카운트를 되돌려 합산
    pub fn restore(&self, counts: MetricCounts) {
        if counts.is_empty() {
            return;
        }
        let restored = counts.len();
        self.counts.lock().merge(counts);
        debug!("메트릭 {restored}개 항목 복원");
    }
}
