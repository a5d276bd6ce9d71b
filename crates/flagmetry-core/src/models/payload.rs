//! 텔레메트리 전송 페이로드.
//!
//! `MetricCounts`를 서버가 받는 JSON 구조로 변환한다.
//! 항목은 입력 순서 그대로 하나씩 만들며 병합하지 않는다.

use serde::{Deserialize, Serialize};

use crate::models::metric::MetricCounts;

/// 페이로드 항목 1건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledMetric {
    /// 플래그 이름
    pub key: String,
    /// 분 단위로 내림한 타임스탬프
    pub time: i64,
    /// 평가 결과
    pub result: bool,
    /// 누적 카운트
    pub value: u64,
}

/// 전송 본문 (gzip 압축 전 JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// 제출기 인스턴스 식별자 (재시도 간 동일)
    pub request_id: String,
    pub enabled_metrics: Vec<EnabledMetric>,
}

impl TelemetryPayload {
    /// 메트릭 매핑으로 페이로드 생성
    pub fn build(request_id: &str, metrics: &MetricCounts) -> Self {
        let enabled_metrics = metrics
            .iter()
            .map(|(metric, count)| EnabledMetric {
                key: metric.name().to_string(),
                time: metric.time_bucket(),
                result: metric.result(),
                value: count,
            })
            .collect();

        Self {
            request_id: request_id.to_string(),
            enabled_metrics,
        }
    }

    /// JSON 바이트로 직렬화
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
