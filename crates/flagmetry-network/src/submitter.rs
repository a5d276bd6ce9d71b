//! 텔레메트리 제출기.
//!
//! 메트릭 매핑 → 페이로드 → gzip 본문 → 전송 시도 루프 (백오프 재시도).
//!
//! - 페이로드/본문/헤더는 `call`마다 한 번만 만들고 모든 재시도에 재사용한다.
//! - `request_id`는 인스턴스 생성 시 한 번 정해지며 모든 호출과 재시도에서 같다.
//! - 치명적 상태 코드와 재시도 소진은 `Discarded`로 반환한다 (에러로 올리지 않음).
//! - 분류되지 않은 전송 에러만 `Err`로 전파된다.

use flagmetry_core::config::{CloudConfig, TelemetryConfig};
use flagmetry_core::error::CoreError;
use flagmetry_core::models::metric::MetricCounts;
use flagmetry_core::models::payload::TelemetryPayload;
use flagmetry_core::ports::backoff::BackoffPolicy;
use flagmetry_core::ports::compressor::Compressor;
use flagmetry_core::ports::environment::EnvironmentInfo;
use flagmetry_core::ports::transport::{
    ServerDirectives, TelemetryRequest, TelemetryResponse, TelemetryTransport,
};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backoff::ExponentialBackoff;
use crate::compression::GzipCompressor;
use crate::environment::SystemEnvironment;
use crate::headers::build_headers;
use crate::http_transport::HttpTransport;
use crate::outcome::{classify, AttemptOutcome};

/// 제출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 빈 매핑: 전송하지 않음
    Skipped,
    /// 2xx 응답 수신
    Delivered {
        response: TelemetryResponse,
        /// 총 시도 횟수 (첫 시도 포함)
        attempts: u32,
    },
    /// 전송 포기: 데이터는 버려진다
    Discarded(DiscardReason),
}

/// 전송 포기 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// 재시도하지 않는 상태 코드 (429 외 4xx 등)
    Rejected { status: u16, attempts: u32 },
    /// 재시도 한도 소진
    Exhausted { attempts: u32, last_failure: String },
}

impl SubmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmitOutcome::Delivered { .. })
    }

    /// 총 시도 횟수 (`Skipped`는 0)
    pub fn attempts(&self) -> u32 {
        match self {
            SubmitOutcome::Skipped => 0,
            SubmitOutcome::Delivered { attempts, .. } => *attempts,
            SubmitOutcome::Discarded(DiscardReason::Rejected { attempts, .. })
            | SubmitOutcome::Discarded(DiscardReason::Exhausted { attempts, .. }) => *attempts,
        }
    }

    /// 전송 성공 시 서버 지시사항
    pub fn directives(&self) -> Option<ServerDirectives> {
        match self {
            SubmitOutcome::Delivered { response, .. } => Some(response.directives()),
            _ => None,
        }
    }
}

/// 텔레메트리 제출기
///
/// 같은 인스턴스의 `call`은 내부 뮤텍스로 직렬화되므로,
/// `retries()`는 항상 가장 최근 호출의 재시도 횟수를 나타낸다.
pub struct TelemetrySubmitter {
    cloud: CloudConfig,
    request_id: String,
    transport: Arc<dyn TelemetryTransport>,
    compressor: Arc<dyn Compressor>,
    environment: Arc<dyn EnvironmentInfo>,
    backoff_policy: Mutex<Box<dyn BackoffPolicy>>,
    /// 호출 직렬화 (await 구간 포함)
    call_lock: tokio::sync::Mutex<()>,
}

impl TelemetrySubmitter {
    /// 기본 어댑터로 제출기 생성
    ///
    /// HTTP 전송, gzip 압축, 시스템 환경, 기본 지수 백오프(1s~30s, 9회 재시도).
    pub fn new(config: &CloudConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(config)?);
        let mut submitter = Self::with_transport(config.token.clone(), transport);
        submitter.cloud = config.clone();
        Ok(submitter)
    }

    /// 텔레메트리 설정의 백오프를 적용해 생성
    pub fn from_config(
        cloud: &CloudConfig,
        telemetry: &TelemetryConfig,
    ) -> Result<Self, CoreError> {
        let policy = ExponentialBackoff::from_config(&telemetry.backoff)?;
        Ok(Self::new(cloud)?.with_backoff_policy(Box::new(policy)))
    }

    /// 전송 어댑터를 지정해 생성 (나머지는 기본값)
    ///
    /// `cloud_config()`는 토큰만 채운 기본 설정을 돌려준다.
    pub fn with_transport(
        token: impl Into<String>,
        transport: Arc<dyn TelemetryTransport>,
    ) -> Self {
        Self {
            cloud: CloudConfig::with_token(token),
            request_id: uuid::Uuid::new_v4().to_string(),
            transport,
            compressor: Arc::new(GzipCompressor::new()),
            environment: Arc::new(SystemEnvironment::new()),
            backoff_policy: Mutex::new(Box::new(ExponentialBackoff::default())),
            call_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 백오프 정책 교체
    pub fn with_backoff_policy(mut self, policy: Box<dyn BackoffPolicy>) -> Self {
        self.backoff_policy = Mutex::new(policy);
        self
    }

    /// 압축기 교체
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// 실행 환경 조회기 교체
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentInfo>) -> Self {
        self.environment = environment;
        self
    }

    /// 생성에 쓴 연결 설정
    pub fn cloud_config(&self) -> &CloudConfig {
        &self.cloud
    }

    /// 인스턴스 고정 요청 ID
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// 백오프 정책 조회 (잠금 가드)
    ///
    /// 가드를 쥔 채로 `call`을 await하지 말 것.
    pub fn backoff_policy(&self) -> MappedMutexGuard<'_, dyn BackoffPolicy> {
        MutexGuard::map(self.backoff_policy.lock(), |policy| &mut **policy)
    }

    /// 가장 최근 호출의 재시도 횟수
    pub fn retries(&self) -> u32 {
        self.backoff_policy.lock().retries()
    }

    /// 페이로드 생성
    pub fn build_payload(&self, metrics: &MetricCounts) -> TelemetryPayload {
        TelemetryPayload::build(&self.request_id, metrics)
    }

    /// 전송 요청 생성: JSON 직렬화 + 압축 + 헤더
    pub fn prepare_request(&self, metrics: &MetricCounts) -> Result<TelemetryRequest, CoreError> {
        let json = self.build_payload(metrics).to_json()?;
        let body = self.compressor.compress(&json)?;
        let headers = build_headers(
            &self.cloud.token,
            self.compressor.content_encoding(),
            &self.environment.snapshot(),
        );
        debug!(
            "텔레메트리 요청 생성: {}개 항목, {}B → {}B",
            metrics.len(),
            json.len(),
            body.len()
        );
        Ok(TelemetryRequest { headers, body })
    }

    /// 메트릭 제출
    ///
    /// 빈 매핑이면 네트워크 활동 없이 `Skipped`를 반환한다.
    pub async fn call(&self, metrics: &MetricCounts) -> Result<SubmitOutcome, CoreError> {
        if metrics.is_empty() {
            return Ok(SubmitOutcome::Skipped);
        }

        let _guard = self.call_lock.lock().await;
        self.backoff_policy.lock().reset();

        let request = self.prepare_request(metrics)?;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let result = self.transport.send(&request).await;

            match classify(result)? {
                AttemptOutcome::Success(response) => {
                    debug!(
                        "텔레메트리 전송 성공: status={}, 시도 {attempts}회",
                        response.status
                    );
                    return Ok(SubmitOutcome::Delivered { response, attempts });
                }
                AttemptOutcome::Fatal(response) => {
                    warn!(
                        "텔레메트리 전송 거부 (status={}), 재시도 없이 폐기",
                        response.status
                    );
                    return Ok(SubmitOutcome::Discarded(DiscardReason::Rejected {
                        status: response.status,
                        attempts,
                    }));
                }
                AttemptOutcome::Retryable(reason) => {
                    let Some(delay) = self.next_retry_delay() else {
                        warn!("텔레메트리 재시도 소진 (시도 {attempts}회): {reason}");
                        return Ok(SubmitOutcome::Discarded(DiscardReason::Exhausted {
                            attempts,
                            last_failure: reason.to_string(),
                        }));
                    };

                    debug!("텔레메트리 전송 실패 (시도 {attempts}회): {reason}, {delay:?} 후 재시도");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// 재시도 가능하면 대기 시간을 계산하고 재시도 1회를 기록
    fn next_retry_delay(&self) -> Option<Duration> {
        let mut policy = self.backoff_policy.lock();
        if !policy.should_retry() {
            return None;
        }
        let delay = policy.next_delay();
        policy.record_attempt();
        Some(delay)
    }
}
