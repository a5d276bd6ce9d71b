//! 실행 환경 조회 어댑터.
//!
//! `EnvironmentInfo` 포트 구현. 호스트명은 sysinfo, 나머지는 std에서 읽는다.

use flagmetry_core::ports::environment::{ClientEnvironment, EnvironmentInfo};
use sysinfo::System;

/// 실행 엔진 이름
pub const ENGINE: &str = "rustc";
/// 언어 이름
pub const LANGUAGE: &str = "rust";

/// 현재 프로세스 기준 환경 정보: `EnvironmentInfo` 포트 구현
///
/// 호스트명은 생성 시 한 번만 조회한다. 스레드 ID는 `snapshot` 호출 스레드 기준.
#[derive(Debug, Clone)]
pub struct SystemEnvironment {
    hostname: String,
}

impl SystemEnvironment {
    pub fn new() -> Self {
        Self {
            hostname: System::host_name().unwrap_or_default(),
        }
    }
}

impl Default for SystemEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentInfo for SystemEnvironment {
    fn snapshot(&self) -> ClientEnvironment {
        ClientEnvironment {
            engine: ENGINE.to_string(),
            hostname: self.hostname.clone(),
            language: LANGUAGE.to_string(),
            language_version: language_version(),
            pid: std::process::id(),
            platform: platform(),
            thread: current_thread_id(),
        }
    }
}

/// 크레이트가 선언한 러스트 툴체인 버전
fn language_version() -> String {
    let declared = env!("CARGO_PKG_RUST_VERSION");
    if declared.is_empty() {
        "unknown".to_string()
    } else {
        declared.to_string()
    }
}

/// `<arch>-<os>` 형식 플랫폼 문자열
fn platform() -> String {
    format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS)
}

/// 현재 스레드의 숫자 ID (`ThreadId(7)` → "7")
fn current_thread_id() -> String {
    let raw = format!("{:?}", std::thread::current().id());
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        raw
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_process() {
        let env = SystemEnvironment::new().snapshot();
        assert_eq!(env.engine, "rustc");
        assert_eq!(env.language, "rust");
        assert_eq!(env.pid, std::process::id());
        assert!(env.platform.contains(std::env::consts::OS));
        assert!(!env.language_version.is_empty());
    }

    #[test]
    fn thread_id_is_numeric() {
        let id = current_thread_id();
        assert!(id.chars().all(|c| c.is_ascii_digit()), "{id}");
    }

    #[test]
    fn thread_id_differs_between_threads() {
        let main_id = current_thread_id();
        let other_id = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(main_id, other_id);
    }
}
