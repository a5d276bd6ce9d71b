//! HTTP 텔레메트리 전송.
//!
//! `TelemetryTransport` 포트 구현. 호출마다 POST 1회, 재시도는 하지 않는다.
//! 리다이렉트는 따라가지 않고 3xx 상태 그대로 돌려준다.
//! reqwest 에러는 원인 체인을 따라가며 `TransportError` 종류로 분류한다.

use async_trait::async_trait;
use flagmetry_core::config::CloudConfig;
use flagmetry_core::error::CoreError;
use flagmetry_core::ports::transport::{
    TelemetryRequest, TelemetryResponse, TelemetryTransport, TransportError,
};
use std::error::Error as StdError;
use std::io;
use tracing::debug;

/// reqwest 기반 전송: `TelemetryTransport` 포트 구현
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// 설정의 텔레메트리 URL과 타임아웃으로 생성
    pub fn new(config: &CloudConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            url: config.telemetry_url(),
        })
    }

    /// 전송 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TelemetryTransport for HttpTransport {
    async fn send(
        &self,
        request: &TelemetryRequest,
    ) -> Result<TelemetryResponse, TransportError> {
        let mut builder = self.client.post(&self.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // 본문은 판단에 쓰지 않지만 끝까지 읽어 스트림 조기 종료를 감지한다
        let body = resp.bytes().await.map_err(|e| classify_reqwest_error(&e))?;
        debug!("텔레메트리 응답: status={status}, body={}B", body.len());

        Ok(TelemetryResponse { status, headers })
    }
}

/// reqwest 에러를 전송 에러 종류로 분류
///
/// 문자열 매칭은 원인 체인 메시지에만 한다. 최상위 메시지에는 요청 URL이 들어 있다.
pub fn classify_reqwest_error(err: &reqwest::Error) -> TransportError {
    let detail = error_chain(err);

    if err.is_builder() {
        return TransportError::InvalidRequest(detail);
    }
    if err.is_redirect() {
        return TransportError::Other(detail);
    }
    if err.is_timeout() {
        return TransportError::Timeout(detail);
    }
    if let Some(mapped) = find_io_kind(err).and_then(|kind| map_io_kind(kind, &detail)) {
        return mapped;
    }

    let causes = source_chain(err).to_ascii_lowercase();
    if ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| causes.contains(needle))
    {
        return TransportError::Tls(detail);
    }
    if err.is_connect() {
        if ["dns", "resolve", "lookup"]
            .iter()
            .any(|needle| causes.contains(needle))
        {
            return TransportError::Dns(detail);
        }
        return TransportError::Connect(detail);
    }
    if err.is_body() || err.is_decode() {
        return TransportError::MalformedResponse(detail);
    }
    if ["closed before message completed", "incomplete message", "unexpected eof"]
        .iter()
        .any(|needle| causes.contains(needle))
    {
        return TransportError::UnexpectedEof(detail);
    }
    if err.is_request() {
        return TransportError::Protocol(detail);
    }

    TransportError::Other(detail)
}

/// I/O 에러 종류 → 전송 에러 (재시도 대상만)
pub fn map_io_kind(kind: io::ErrorKind, detail: &str) -> Option<TransportError> {
    let detail = detail.to_string();
    let mapped = match kind {
        io::ErrorKind::ConnectionReset => TransportError::ConnectionReset(detail),
        io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused(detail),
        io::ErrorKind::ConnectionAborted => TransportError::ConnectionAborted(detail),
        io::ErrorKind::HostUnreachable => TransportError::HostUnreachable(detail),
        io::ErrorKind::NetworkUnreachable => TransportError::NetworkUnreachable(detail),
        io::ErrorKind::BrokenPipe => TransportError::BrokenPipe(detail),
        io::ErrorKind::TimedOut => TransportError::Timeout(detail),
        io::ErrorKind::UnexpectedEof => TransportError::UnexpectedEof(detail),
        io::ErrorKind::InvalidInput
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => TransportError::Socket(detail),
        _ => return None,
    };
    Some(mapped)
}

/// 원인 체인에서 첫 `io::Error`의 종류
fn find_io_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = current.source();
    }
    None
}

/// 에러와 모든 원인 메시지를 ": "로 연결 (로그/에러 메시지용)
fn error_chain(err: &reqwest::Error) -> String {
    let causes = source_chain(err);
    if causes.is_empty() {
        err.to_string()
    } else {
        format!("{err}: {causes}")
    }
}

/// 최상위 메시지를 뺀 원인 메시지들
fn source_chain(err: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(current) = source {
        parts.push(current.to_string());
        source = current.source();
    }
    parts.join(": ")
}
