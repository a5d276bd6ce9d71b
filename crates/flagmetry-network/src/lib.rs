//! # flagmetry-network
//!
//! 텔레메트리 전송 어댑터.
//! 피처 플래그 사용량 카운트를 gzip JSON으로 수집 서버에 POST하며,
//! 429/5xx/일시적 네트워크 장애는 지수 백오프로 재시도한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use flagmetry_core::config::CloudConfig;
//! use flagmetry_network::submitter::TelemetrySubmitter;
//!
//! let submitter = TelemetrySubmitter::new(&CloudConfig::with_token("asdf"))?;
//! let outcome = submitter.call(&counts).await?;
//! ```

pub mod backoff;
pub mod compression;
pub mod environment;
pub mod headers;
pub mod http_transport;
pub mod outcome;
pub mod reporter;
pub mod storage;
pub mod submitter;
