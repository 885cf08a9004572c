//! # lsbridge-core
//!
//! Lightstep → Sumo Logic 메트릭 브리지의 도메인 모델, 포트(trait), 에러 타입.
//! 네트워크/앱 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`config`]: 설정 구조체와 타깃별 3단계 병합
//! - [`config_loader`]: 설정 파일 로드
//! - [`models`]: 시간 창, 응답, 메트릭 레코드
//! - [`encoder`]: 응답 → carbon2 레코드 변환
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 에러 타입 (thiserror)

pub mod config;
pub mod config_loader;
pub mod encoder;
pub mod error;
pub mod models;
pub mod ports;
