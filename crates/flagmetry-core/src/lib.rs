//! # flagmetry-core
//!
//! Flagmetry 도메인 모델, 포트(trait) 정의, 에러 타입, 설정.
//! 네트워크 어댑터와 앱 바이너리가 공유하는 핵심 타입을 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 메트릭 키, 카운트 매핑, 전송 페이로드
//! - [`ports`]: 전송/백오프/압축/실행 환경 포트 인터페이스
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 서버 연결 및 텔레메트리 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
