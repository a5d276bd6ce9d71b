//! Flagmetry 도메인 모델.
//!
//! 메트릭 키, 카운트 매핑, 전송 페이로드를 정의한다.

pub mod metric;
pub mod payload;
