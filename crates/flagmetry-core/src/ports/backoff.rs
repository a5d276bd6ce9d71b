//! 재시도 백오프 정책 포트.
//!
//! 구현: `flagmetry-network` crate (`ExponentialBackoff`)

use std::time::Duration;

/// 재시도 횟수 한도와 재시도 간 대기 시간을 결정하는 정책
///
/// 제출기는 이 trait에만 의존한다. 테스트에서는 대기 시간이 0인 대역으로 교체할 수 있다.
pub trait BackoffPolicy: Send + Sync {
    /// 최소 대기 시간 (밀리초)
    fn min_timeout_ms(&self) -> u64;

    /// 최대 대기 시간 (밀리초)
    fn max_timeout_ms(&self) -> u64;

    /// 지금까지 수행한 재시도 횟수 (첫 시도 제외)
    fn retries(&self) -> u32;

    /// 허용 재시도 횟수
    fn max_retries(&self) -> u32;

    /// 재시도 가능 여부
    fn should_retry(&self) -> bool {
        self.retries() < self.max_retries()
    }

    /// 다음 재시도 전 대기 시간
    fn next_delay(&self) -> Duration;

    /// 재시도 1회 기록
    fn record_attempt(&mut self);

    /// 재시도 카운터 초기화
    fn reset(&mut self);
}
