//! 실행 환경 정보 포트.
//!
//! 구현: `flagmetry-network` crate (sysinfo + std)

/// 클라이언트 식별 헤더에 들어가는 실행 환경 스냅샷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEnvironment {
    /// 실행 엔진 (예: "rustc")
    pub engine: String,
    /// 호스트 이름
    pub hostname: String,
    /// 언어 이름
    pub language: String,
    /// 언어 버전
    pub language_version: String,
    /// 프로세스 ID
    pub pid: u32,
    /// 플랫폼 (arch-os)
    pub platform: String,
    /// 호출 스레드 식별자
    pub thread: String,
}

/// 실행 환경 조회
///
/// 전역 상태(호스트명, PID, 스레드)를 직접 읽지 않도록 주입받는다.
pub trait EnvironmentInfo: Send + Sync {
    /// 현재 환경 스냅샷
    fn snapshot(&self) -> ClientEnvironment;
}
