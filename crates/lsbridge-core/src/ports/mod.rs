//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! `lsbridge-network`가 이 trait들을 구현하며,
//! `lsbridge-app`에서 타깃마다 `Arc<dyn T>`로 와이어링한다.
//!
//! 비동기 trait은 `async_trait` 매크로로 object safety를 보장한다.

pub mod compressor;
pub mod metric_sink;
pub mod timeseries_source;

pub use compressor::Compressor;
pub use metric_sink::MetricSink;
pub use timeseries_source::{SeriesQuery, TimeseriesSource};
