//! 타임시리즈 조회 포트.
//!
//! 구현: `lsbridge-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::models::{RawSeriesResponse, TimeWindow};

/// 저장 검색 하나에 대한 조회 요청
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub project: String,
    pub search: String,
    pub resolution_ms: u64,
    pub percentiles: Vec<f64>,
    pub window: TimeWindow,
    pub include_ops_counts: bool,
    pub include_error_counts: bool,
}

fn flag(value: bool) -> String {
    let rendered = if value { "1" } else { "0" };
    rendered.to_string()
}

impl SeriesQuery {
    /// 쿼리 파라미터 (백분위는 반복 키)
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("resolution-ms", self.resolution_ms.to_string())];
        params.extend(self.percentiles.iter().map(|p| {
            let rendered = serde_json::Number::from_f64(*p)
                .map(|n| n.to_string())
                .unwrap_or_else(|| p.to_string());
            ("percentile", rendered)
        }));
        params.push(("oldest-time", self.window.oldest_param()));
        params.push(("youngest-time", self.window.youngest_param()));
        params.push(("include-ops-counts", flag(self.include_ops_counts)));
        params.push(("include-error-counts", flag(self.include_error_counts)));
        params
    }
}

/// 원격 타임시리즈 조회
///
/// non-2xx/전송 실패는 `UpstreamFailure`, 디코딩 실패는 `ParseFailure`.
#[async_trait]
pub trait TimeseriesSource: Send + Sync {
    async fn fetch(&self, query: &SeriesQuery) -> Result<RawSeriesResponse, ExtractionError>;
}
