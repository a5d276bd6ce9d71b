//! 전송 시도 결과 분류.
//!
//! 성공 / 재시도 가능 실패 / 치명적 실패 3분류. 분류되지 않은 전송 에러는 `Err`로 전파한다.

use flagmetry_core::error::CoreError;
use flagmetry_core::ports::transport::{TelemetryResponse, TransportError};
use std::fmt;

/// 429 Too Many Requests
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// 전송 1회의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx
    Success(TelemetryResponse),
    /// 429, 5xx, 일시적 전송 에러
    Retryable(RetryReason),
    /// 그 밖의 상태 코드: 재시도하지 않음
    Fatal(TelemetryResponse),
}

/// 재시도 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// 429 또는 5xx 응답
    Status(u16),
    /// 일시적 전송 에러
    Transport(TransportError),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::Status(status) => write!(f, "HTTP {status}"),
            RetryReason::Transport(err) => write!(f, "{err}"),
        }
    }
}

/// 상태 코드 분류
pub fn classify_status(response: TelemetryResponse) -> AttemptOutcome {
    match response.status {
        200..=299 => AttemptOutcome::Success(response),
        STATUS_TOO_MANY_REQUESTS | 500..=599 => {
            AttemptOutcome::Retryable(RetryReason::Status(response.status))
        }
        _ => AttemptOutcome::Fatal(response),
    }
}

/// 전송 결과 분류
///
/// 일시적이지 않은 전송 에러는 `CoreError::Transport`로 반환한다.
pub fn classify(
    result: Result<TelemetryResponse, TransportError>,
) -> Result<AttemptOutcome, CoreError> {
    match result {
        Ok(response) => Ok(classify_status(response)),
        Err(err) if err.is_transient() => {
            Ok(AttemptOutcome::Retryable(RetryReason::Transport(err)))
        }
        Err(err) => Err(CoreError::Transport(err)),
    }
}
