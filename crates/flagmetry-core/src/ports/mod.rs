//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! `flagmetry-network`가 이 trait들을 구현하며,
//! 제출기는 `Arc<dyn T>` / `Box<dyn T>`로 주입받는다.
//!
//! async trait은 `async_trait` 매크로로 object safety를 보장한다.

pub mod backoff;
pub mod compressor;
pub mod environment;
pub mod transport;
