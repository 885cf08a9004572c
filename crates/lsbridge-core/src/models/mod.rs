//! lsbridge 도메인 모델.
//!
//! 조회 시간 창, Lightstep 응답, carbon2 메트릭 레코드.

pub mod metric;
pub mod timeseries;
pub mod window;

pub use metric::{MetricKind, MetricRecord};
pub use timeseries::{LatencySeries, RawSeriesResponse, SeriesAttributes, SeriesData, SeriesTimeWindow};
pub use window::{floor_to_minute, TimeWindow};
