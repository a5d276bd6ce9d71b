//! 텔레메트리 요청 헤더.
//!
//! 인증 토큰, 본문 형식, 클라이언트 식별 헤더를 고정 순서로 만든다.

use flagmetry_core::ports::environment::ClientEnvironment;

pub const ACCEPT: &str = "Accept";
pub const CLIENT_ENGINE: &str = "Client-Engine";
pub const CLIENT_HOSTNAME: &str = "Client-Hostname";
pub const CLIENT_LANGUAGE: &str = "Client-Language";
pub const CLIENT_LANGUAGE_VERSION: &str = "Client-Language-Version";
pub const CLIENT_PID: &str = "Client-Pid";
pub const CLIENT_PLATFORM: &str = "Client-Platform";
pub const CLIENT_THREAD: &str = "Client-Thread";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_TYPE: &str = "Content-Type";
/// 수집 서버 인증 토큰 헤더
pub const TOKEN: &str = "Flipper-Cloud-Token";
pub const SCHEMA_VERSION: &str = "Schema-Version";
pub const USER_AGENT: &str = "User-Agent";

/// 페이로드 스키마 버전
pub const SCHEMA_VERSION_V1: &str = "V1";

const JSON: &str = "application/json";

/// 클라이언트 User-Agent
pub fn user_agent() -> String {
    format!("Flagmetry HTTP Adapter v{}", env!("CARGO_PKG_VERSION"))
}

/// 요청 헤더 목록 생성
pub fn build_headers(
    token: &str,
    content_encoding: &str,
    env: &ClientEnvironment,
) -> Vec<(String, String)> {
    [
        (ACCEPT, JSON.to_string()),
        (CLIENT_ENGINE, env.engine.clone()),
        (CLIENT_HOSTNAME, env.hostname.clone()),
        (CLIENT_LANGUAGE, env.language.clone()),
        (CLIENT_LANGUAGE_VERSION, env.language_version.clone()),
        (CLIENT_PID, env.pid.to_string()),
        (CLIENT_PLATFORM, env.platform.clone()),
        (CLIENT_THREAD, env.thread.clone()),
        (CONTENT_ENCODING, content_encoding.to_string()),
        (CONTENT_TYPE, JSON.to_string()),
        (TOKEN, token.to_string()),
        (SCHEMA_VERSION, SCHEMA_VERSION_V1.to_string()),
        (USER_AGENT, user_agent()),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
}
