//! # lsbridge-network
//!
//! Lightstep/Sumo Logic HTTP 어댑터.
//! 타임시리즈 조회, carbon2 배치 전송, gzip 압축, 재시도 정책, 배치 디스패처를 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use lsbridge_network::batch_dispatcher::BatchDispatcher;
//! use lsbridge_network::compression::GzipCompressor;
//! use lsbridge_network::lightstep_client::LightstepClient;
//! use lsbridge_network::retry::RetryPolicy;
//! use lsbridge_network::sumo_client::SumoHttpSink;
//! ```

pub mod batch_dispatcher;
pub mod compression;
pub mod lightstep_client;
pub mod retry;
pub mod sumo_client;
