//! 지수 백오프 정책.
//!
//! `BackoffPolicy` 포트 구현. 지터 없이 결정적으로 대기 시간을 계산한다:
//! 1s → 1.5s → 2.25s → … → 30s (상한)

use flagmetry_core::config::BackoffConfig;
use flagmetry_core::error::CoreError;
use flagmetry_core::ports::backoff::BackoffPolicy;
use std::time::Duration;

/// 기본 최소 대기 시간 (밀리초)
pub const DEFAULT_MIN_TIMEOUT_MS: u64 = 1_000;
/// 기본 최대 대기 시간 (밀리초)
pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 30_000;
/// 기본 배수
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
/// 기본 최대 재시도 횟수 (총 10회 시도)
pub const DEFAULT_MAX_RETRIES: u32 = 9;

/// 지수 백오프: `BackoffPolicy` 포트 구현
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_timeout_ms: u64,
    max_timeout_ms: u64,
    multiplier: f64,
    max_retries: u32,
    retries: u32,
}

impl ExponentialBackoff {
    /// 새 백오프 정책 생성
    ///
    /// `min_timeout_ms`가 `max_timeout_ms`보다 크면 최대값으로 맞추고,
    /// 1.0 미만 배수는 1.0으로 올린다.
    pub fn new(min_timeout_ms: u64, max_timeout_ms: u64, max_retries: u32) -> Self {
        Self {
            min_timeout_ms: min_timeout_ms.min(max_timeout_ms),
            max_timeout_ms,
            multiplier: DEFAULT_MULTIPLIER,
            max_retries,
            retries: 0,
        }
    }

    /// 설정에서 생성 (검증 포함)
    pub fn from_config(config: &BackoffConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::new(config.min_timeout_ms, config.max_timeout_ms, config.max_retries)
            .with_multiplier(config.multiplier))
    }

    /// 배수 설정
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            DEFAULT_MULTIPLIER
        };
        self
    }

    /// n번째 재시도(0부터) 대기 시간
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        let ms = self.min_timeout_ms as f64 * self.multiplier.powi(exp);
        let capped = if ms.is_finite() {
            ms.min(self.max_timeout_ms as f64)
        } else {
            self.max_timeout_ms as f64
        };
        Duration::from_millis(capped as u64)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_TIMEOUT_MS,
            DEFAULT_MAX_TIMEOUT_MS,
            DEFAULT_MAX_RETRIES,
        )
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn min_timeout_ms(&self) -> u64 {
        self.min_timeout_ms
    }

    fn max_timeout_ms(&self) -> u64 {
        self.max_timeout_ms
    }

    fn retries(&self) -> u32 {
        self.retries
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn next_delay(&self) -> Duration {
        self.delay_for_retry(self.retries)
    }

    fn record_attempt(&mut self) {
        self.retries = self.retries.saturating_add(1);
    }

    fn reset(&mut self) {
        self.retries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = ExponentialBackoff::default();
        assert_eq!(policy.min_timeout_ms(), 1_000);
        assert_eq!(policy.max_timeout_ms(), 30_000);
        assert_eq!(policy.max_retries(), 9);
        assert_eq!(policy.retries(), 0);
        assert!(policy.should_retry());
    }

    #[test]
    fn first_delay_is_min() {
        let policy = ExponentialBackoff::default();
        assert_eq!(policy.next_delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn delays_grow_and_cap() {
        let mut policy = ExponentialBackoff::default();
        let mut previous = Duration::ZERO;
        for _ in 0..20 {
            let delay = policy.next_delay();
            assert!(delay >= previous, "{delay:?} < {previous:?}");
            assert!(delay <= Duration::from_millis(30_000));
            previous = delay;
            policy.record_attempt();
        }
        assert_eq!(previous, Duration::from_millis(30_000));
    }

    #[test]
    fn expected_sequence() {
        let policy = ExponentialBackoff::default();
        let delays: Vec<u128> = (0..4).map(|n| policy.delay_for_retry(n).as_millis()).collect();
        assert_eq!(delays, vec![1_000, 1_500, 2_250, 3_375]);
    }

    #[test]
    fn exhaustion_and_reset() {
        let mut policy = ExponentialBackoff::new(10, 100, 2);
        policy.record_attempt();
        assert!(policy.should_retry());
        policy.record_attempt();
        assert!(!policy.should_retry());
        assert_eq!(policy.retries(), 2);

        policy.reset();
        assert_eq!(policy.retries(), 0);
        assert!(policy.should_retry());
    }

    #[test]
    fn huge_retry_count_stays_capped() {
        let policy = ExponentialBackoff::default();
        assert_eq!(
            policy.delay_for_retry(u32::MAX),
            Duration::from_millis(30_000)
        );
    }

    #[test]
    fn from_config_validates() {
        let config = BackoffConfig {
            min_timeout_ms: 500,
            max_timeout_ms: 2_000,
            multiplier: 2.0,
            max_retries: 3,
        };
        let policy = ExponentialBackoff::from_config(&config).unwrap();
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(1_000));
        assert_eq!(policy.max_retries(), 3);

        let bad = BackoffConfig {
            min_timeout_ms: 5_000,
            max_timeout_ms: 1_000,
            ..BackoffConfig::default()
        };
        assert!(ExponentialBackoff::from_config(&bad).is_err());
    }
}
