//! 사용량 메트릭 모델.
//!
//! 피처 플래그 평가 1건을 식별하는 `Metric`과
//! 메트릭별 누적 카운트를 담는 `MetricCounts`를 정의.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 시간 버킷 크기 (초)
pub const BUCKET_SECS: i64 = 60;

/// 타임스탬프를 해당 분의 시작 시각으로 내림
///
/// `i64::MIN` 근처에서는 넘치지 않고 `i64::MIN`에 머문다.
pub fn bucket_timestamp(timestamp: i64) -> i64 {
    timestamp.saturating_sub(timestamp.rem_euclid(BUCKET_SECS))
}

/// 카운트 대상 이벤트: 플래그 이름 + 평가 결과 + 타임스탬프
///
/// 생성 이후 변경할 수 없다. 세 필드가 모두 같을 때만 같은 키로 취급한다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    result: bool,
    timestamp: i64,
}

impl Metric {
    /// 새 메트릭 생성 (`timestamp`: Unix epoch 초)
    pub fn new(name: impl Into<String>, result: bool, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            result,
            timestamp,
        }
    }

    /// 현재 시각으로 메트릭 생성
    pub fn now(name: impl Into<String>, result: bool) -> Self {
        Self::new(name, result, chrono::Utc::now().timestamp())
    }

    /// 플래그 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 평가 결과
    pub fn result(&self) -> bool {
        self.result
    }

    /// 원본 타임스탬프 (초)
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// 분 단위로 내림한 타임스탬프
    pub fn time_bucket(&self) -> i64 {
        bucket_timestamp(self.timestamp)
    }
}

/// 메트릭 → 카운트 매핑 (삽입 순서 유지)
///
/// 이미 있는 키를 다시 넣으면 위치는 그대로 두고 값만 교체한다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricCounts {
    entries: Vec<(Metric, u64)>,
    index: HashMap<Metric, usize>,
}

impl MetricCounts {
    /// 빈 매핑 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 카운트 설정. 기존 값이 있으면 반환
    pub fn insert(&mut self, metric: Metric, count: u64) -> Option<u64> {
        match self.index.get(&metric) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, count)),
            None => {
                self.index.insert(metric.clone(), self.entries.len());
                self.entries.push((metric, count));
                None
            }
        }
    }

    /// 카운트 증가. 없는 키는 `by`로 시작
    pub fn increment(&mut self, metric: Metric, by: u64) -> u64 {
        match self.index.get(&metric) {
            Some(&pos) => {
                let slot = &mut self.entries[pos].1;
                *slot = slot.saturating_add(by);
                *slot
            }
            None => {
                self.insert(metric, by);
                by
            }
        }
    }

    /// 다른 매핑의 카운트를 합산
    pub fn merge(&mut self, other: MetricCounts) {
        for (metric, count) in other {
            self.increment(metric, count);
        }
    }

    /// 카운트 조회
    pub fn get(&self, metric: &Metric) -> Option<u64> {
        self.index.get(metric).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 전체 카운트 합
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// 삽입 순서대로 순회
    pub fn iter(&self) -> impl Iterator<Item = (&Metric, u64)> + '_ {
        self.entries.iter().map(|(metric, count)| (metric, *count))
    }
}

impl FromIterator<(Metric, u64)> for MetricCounts {
    fn from_iter<I: IntoIterator<Item = (Metric, u64)>>(iter: I) -> Self {
        let mut counts = MetricCounts::new();
        for (metric, count) in iter {
            counts.insert(metric, count);
        }
        counts
    }
}

impl IntoIterator for MetricCounts {
    type Item = (Metric, u64);
    type IntoIter = std::vec::IntoIter<(Metric, u64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
