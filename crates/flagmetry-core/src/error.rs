//! Flagmetry 핵심 에러 타입.
//!
//! 어댑터 crate는 외부 라이브러리 에러를 `map_err`로 `CoreError`에 매핑한다.

use thiserror::Error;

use crate::ports::transport::TransportError;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 전송 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 재시도 대상으로 분류되지 않은 전송 에러
    #[error("전송 에러: {0}")]
    Transport(#[from] TransportError),

    /// 네트워크 클라이언트 구성 실패
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}
