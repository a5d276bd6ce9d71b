//! 애플리케이션 설정 구조체.
//!
//! 수집 서버 URL/토큰, 전송 타임아웃, 텔레메트리 주기와 백오프 설정을 정의한다.
//! `ConfigManager`가 JSON 파일에서 로드하고, 환경변수로 덮어쓸 수 있다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 토큰 환경변수
pub const ENV_TOKEN: &str = "FLAGMETRY_TOKEN";
/// 서버 URL 환경변수
pub const ENV_URL: &str = "FLAGMETRY_URL";
/// 텔레메트리 활성화 환경변수
pub const ENV_TELEMETRY_ENABLED: &str = "FLAGMETRY_TELEMETRY_ENABLED";
/// 텔레메트리 주기 환경변수 (초)
pub const ENV_TELEMETRY_INTERVAL_SECS: &str = "FLAGMETRY_TELEMETRY_INTERVAL_SECS";

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 수집 서버 연결 설정
    #[serde(default)]
    pub cloud: CloudConfig,
    /// 텔레메트리 설정
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

// ============================================================
// 서버 연결 설정
// ============================================================

/// 수집 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// 서버 기본 URL (예: "https://www.flippercloud.io/adapter")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 인증 토큰
    #[serde(default)]
    pub token: String,
    /// 연결 타임아웃 (밀리초)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// 요청 전체 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl CloudConfig {
    /// 토큰을 지정해 기본 설정 생성
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// 텔레메트리 엔드포인트 URL
    pub fn telemetry_url(&self) -> String {
        format!("{}/telemetry", self.base_url.trim_end_matches('/'))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 토큰/URL/타임아웃 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.token.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "cloud.token".to_string(),
                message: format!("토큰이 필요합니다 (설정 파일 또는 {ENV_TOKEN})"),
            });
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| CoreError::Validation {
            field: "cloud.base_url".to_string(),
            message: format!("URL 파싱 실패: {e}"),
        })?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(CoreError::Validation {
                field: "cloud.base_url".to_string(),
                message: format!("지원하지 않는 스킴: {}", url.scheme()),
            });
        }

        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(CoreError::Validation {
                field: "cloud.request_timeout_ms".to_string(),
                message: "타임아웃은 0보다 커야 합니다".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================
// 텔레메트리 설정
// ============================================================

/// 텔레메트리 설정: 전송 주기와 재시도 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// 텔레메트리 전송 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 전송 주기 (초)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 재시도 백오프 설정
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// 전송 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// 지수 백오프 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// 첫 재시도 대기 시간 (밀리초)
    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,
    /// 최대 대기 시간 (밀리초)
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
    /// 재시도마다 곱하는 배수
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// 최대 재시도 횟수 (첫 시도 제외)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_timeout_ms: default_min_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            multiplier: default_multiplier(),
            max_retries: default_max_retries(),
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.min_timeout_ms > self.max_timeout_ms {
            return Err(CoreError::Validation {
                field: "telemetry.backoff.min_timeout_ms".to_string(),
                message: format!(
                    "min_timeout_ms({})가 max_timeout_ms({})보다 큽니다",
                    self.min_timeout_ms, self.max_timeout_ms
                ),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::Validation {
                field: "telemetry.backoff.multiplier".to_string(),
                message: format!("1.0 이상이어야 합니다: {}", self.multiplier),
            });
        }
        Ok(())
    }
}

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 프로세스 환경변수로 덮어쓰기
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// 조회 함수로 환경변수 덮어쓰기
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.cloud.token = token;
        }
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.trim().is_empty()) {
            self.cloud.base_url = url;
        }
        if let Some(enabled) = lookup(ENV_TELEMETRY_ENABLED) {
            match enabled.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.telemetry.enabled = true,
                "0" | "false" | "no" | "off" => self.telemetry.enabled = false,
                other => tracing::warn!("{ENV_TELEMETRY_ENABLED} 값 무시: {other}"),
            }
        }
        if let Some(interval) = lookup(ENV_TELEMETRY_INTERVAL_SECS) {
            match interval.trim().parse::<u64>() {
                Ok(secs) => self.telemetry.interval_secs = secs,
                Err(e) => tracing::warn!("{ENV_TELEMETRY_INTERVAL_SECS} 파싱 실패: {e}"),
            }
        }
    }

    /// 전체 설정 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        self.cloud.validate()?;
        self.telemetry.backoff.validate()?;
        if self.telemetry.interval_secs == 0 {
            return Err(CoreError::Validation {
                field: "telemetry.interval_secs".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_base_url() -> String {
    "https://www.flippercloud.io/adapter".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_interval_secs() -> u64 {
    60
}
fn default_min_timeout_ms() -> u64 {
    1_000
}
fn default_max_timeout_ms() -> u64 {
    30_000
}
fn default_multiplier() -> f64 {
    1.5
}
fn default_max_retries() -> u32 {
    9
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = AppConfig::default_config();
        assert_eq!(config.cloud.base_url, "https://www.flippercloud.io/adapter");
        assert_eq!(
            config.cloud.telemetry_url(),
            "https://www.flippercloud.io/adapter/telemetry"
        );
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.interval(), Duration::from_secs(60));
        assert_eq!(config.telemetry.backoff.min_timeout_ms, 1_000);
        assert_eq!(config.telemetry.backoff.max_timeout_ms, 30_000);
        assert_eq!(config.telemetry.backoff.max_retries, 9);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"cloud":{"token":"asdf"},"telemetry":{"interval_secs":30}}"#)
                .unwrap();
        assert_eq!(config.cloud.token, "asdf");
        assert_eq!(config.cloud.request_timeout_ms, 5_000);
        assert_eq!(config.telemetry.interval_secs, 30);
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.backoff, BackoffConfig::default());
    }

    #[test]
    fn telemetry_url_trims_trailing_slash() {
        let mut cloud = CloudConfig::with_token("t");
        cloud.base_url = "http://localhost:5000/adapter/".to_string();
        assert_eq!(cloud.telemetry_url(), "http://localhost:5000/adapter/telemetry");
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_TOKEN, "from-env"),
            (ENV_URL, "http://127.0.0.1:9999"),
            (ENV_TELEMETRY_ENABLED, "false"),
            (ENV_TELEMETRY_INTERVAL_SECS, "15"),
        ]);
        let mut config = AppConfig::default_config();
        config.apply_env_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.cloud.token, "from-env");
        assert_eq!(config.cloud.base_url, "http://127.0.0.1:9999");
        assert!(!config.telemetry.enabled);
        assert_eq!(config.telemetry.interval_secs, 15);
    }

    #[test]
    fn env_overrides_ignore_invalid_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_TELEMETRY_ENABLED, "maybe"),
            (ENV_TELEMETRY_INTERVAL_SECS, "soon"),
            (ENV_TOKEN, "  "),
        ]);
        let mut config = AppConfig::default_config();
        config.cloud.token = "keep".to_string();
        config.apply_env_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.cloud.token, "keep");
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.interval_secs, 60);
    }

    #[test]
    fn validate_requires_token() {
        let config = AppConfig::default_config();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "cloud.token"));
    }

    #[test]
    fn validate_rejects_bad_url_and_scheme() {
        let mut config = AppConfig::default_config();
        config.cloud.token = "asdf".to_string();

        config.cloud.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.cloud.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.cloud.base_url = "https://example.com/adapter".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_backoff_bounds() {
        let mut backoff = BackoffConfig::default();
        backoff.min_timeout_ms = 60_000;
        assert!(backoff.validate().is_err());

        let mut backoff = BackoffConfig::default();
        backoff.multiplier = 0.5;
        assert!(backoff.validate().is_err());

        assert!(BackoffConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = AppConfig::default_config();
        config.cloud.token = "asdf".to_string();
        config.telemetry.interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
