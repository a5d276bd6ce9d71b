//! 텔레메트리 전송 포트.
//!
//! 구현: `flagmetry-network` crate (reqwest)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// 서버 지정 전송 주기 응답 헤더
pub const INTERVAL_HEADER: &str = "telemetry-interval";

/// 서버 지정 전송 중단 응답 헤더
pub const SHUTDOWN_HEADER: &str = "telemetry-shutdown";

/// 1회 전송 요청: 헤더 목록 + 압축된 본문
///
/// 한 번의 `call` 동안 만들어진 뒤 모든 재시도에서 그대로 재사용한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRequest {
    /// (이름, 값) 헤더 목록
    pub headers: Vec<(String, String)>,
    /// gzip 압축된 JSON 본문
    pub body: Vec<u8>,
}

impl TelemetryRequest {
    /// 헤더 값 조회 (대소문자 무시)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 서버 응답: 상태 코드와 헤더만 사용
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryResponse {
    /// HTTP 상태 코드
    pub status: u16,
    /// 소문자로 정규화한 응답 헤더
    pub headers: HashMap<String, String>,
}

impl TelemetryResponse {
    /// 상태 코드만으로 응답 생성
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// 헤더 추가 (이름은 소문자로 저장)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// 응답 헤더에 담긴 서버 지시사항
    pub fn directives(&self) -> ServerDirectives {
        let interval = self
            .headers
            .get(INTERVAL_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let shutdown = self
            .headers
            .get(SHUTDOWN_HEADER)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        ServerDirectives { interval, shutdown }
    }
}

/// 서버가 응답 헤더로 내려주는 지시사항
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerDirectives {
    /// 다음 전송까지의 주기
    pub interval: Option<Duration>,
    /// 텔레메트리 전송 중단 요청
    pub shutdown: bool,
}

/// 전송 계층 에러
///
/// `is_transient()`가 true인 종류는 재시도 대상이다.
/// `InvalidRequest`/`Other`는 분류되지 않은 에러로 호출자에게 전파된다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("연결 재설정: {0}")]
    ConnectionReset(String),

    #[error("연결 거부: {0}")]
    ConnectionRefused(String),

    #[error("연결 중단: {0}")]
    ConnectionAborted(String),

    #[error("호스트 도달 불가: {0}")]
    HostUnreachable(String),

    #[error("네트워크 도달 불가: {0}")]
    NetworkUnreachable(String),

    #[error("파이프 끊김: {0}")]
    BrokenPipe(String),

    /// 잘못된 소켓 상태 (EINVAL, ENOTSOCK 등)
    #[error("소켓 에러: {0}")]
    Socket(String),

    #[error("DNS 조회 실패: {0}")]
    Dns(String),

    /// 세부 원인을 알 수 없는 연결 실패
    #[error("연결 실패: {0}")]
    Connect(String),

    /// 연결/읽기/쓰기 타임아웃
    #[error("타임아웃: {0}")]
    Timeout(String),

    #[error("TLS 에러: {0}")]
    Tls(String),

    #[error("프로토콜 에러: {0}")]
    Protocol(String),

    #[error("잘못된 응답: {0}")]
    MalformedResponse(String),

    /// 응답 스트림 조기 종료
    #[error("스트림 조기 종료: {0}")]
    UnexpectedEof(String),

    /// 요청 구성 오류 (잘못된 URL, 헤더 등)
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),

    #[error("알 수 없는 전송 에러: {0}")]
    Other(String),
}

impl TransportError {
    /// 일시적 장애 여부 (재시도 대상)
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            TransportError::InvalidRequest(_) | TransportError::Other(_)
        )
    }
}

/// 텔레메트리 HTTP 전송
///
/// 호출 1회 = POST 1회. 재시도 판단은 호출자(제출기)가 한다.
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// 요청 1회 전송
    async fn send(&self, request: &TelemetryRequest) -> Result<TelemetryResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_from_headers() {
        let response = TelemetryResponse::with_status(200)
            .with_header("Telemetry-Interval", "120")
            .with_header("Telemetry-Shutdown", "true");

        let directives = response.directives();
        assert_eq!(directives.interval, Some(Duration::from_secs(120)));
        assert!(directives.shutdown);
    }

    #[test]
    fn directives_ignore_garbage() {
        let response = TelemetryResponse::with_status(200)
            .with_header(INTERVAL_HEADER, "soon")
            .with_header(SHUTDOWN_HEADER, "nope");

        assert_eq!(response.directives(), ServerDirectives::default());
    }

    #[test]
    fn transient_classification() {
        assert!(TransportError::ConnectionReset("x".into()).is_transient());
        assert!(TransportError::Timeout("x".into()).is_transient());
        assert!(TransportError::Tls("x".into()).is_transient());
        assert!(TransportError::UnexpectedEof("x".into()).is_transient());
        assert!(!TransportError::InvalidRequest("x".into()).is_transient());
        assert!(!TransportError::Other("x".into()).is_transient());
    }

    #[test]
    fn request_header_lookup_ignores_case() {
        let request = TelemetryRequest {
            headers: vec![("Content-Encoding".to_string(), "gzip".to_string())],
            body: vec![],
        };
        assert_eq!(request.header("content-encoding"), Some("gzip"));
        assert_eq!(request.header("Accept"), None);
    }
}
