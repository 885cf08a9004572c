//! Lightstep 타임시리즈 응답 모델.
//!
//! `GET .../searches/{search}/timeseries` 본문을 그대로 옮긴 구조체.
//! 숫자 값은 [`serde_json::Number`]로 보관해 응답에 적힌 표기(`5`, `3.0`)를 유지한다.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// 타임시리즈 조회 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeriesResponse {
    pub data: SeriesData,
}

/// 응답 `data` 객체
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    /// 시리즈 ID
    pub id: String,
    pub attributes: SeriesAttributes,
}

/// 응답 `data.attributes` 객체
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SeriesAttributes {
    /// 서버가 실제 적용한 해상도
    #[serde(default)]
    pub resolution_ms: Option<u64>,
    /// 포인트 수 (아래 배열들의 기대 길이)
    pub points_count: usize,
    #[serde(default)]
    pub time_windows: Vec<SeriesTimeWindow>,
    #[serde(default)]
    pub error_counts: Vec<Number>,
    #[serde(default)]
    pub ops_counts: Vec<Number>,
    #[serde(default)]
    pub latencies: Vec<LatencySeries>,
}

/// 포인트 하나의 시간 구간
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SeriesTimeWindow {
    #[serde(default)]
    pub oldest_time: Option<DateTime<FixedOffset>>,
    pub youngest_time: DateTime<FixedOffset>,
}

/// 백분위 하나의 지연시간 배열
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LatencySeries {
    pub percentile: Number,
    #[serde(default)]
    pub latency_ms: Vec<Number>,
}

impl RawSeriesResponse {
    /// JSON 본문 디코딩
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lightstep_body() {
        let body = br#"{
            "data": {
                "id": "abc123",
                "type": "timeseries",
                "attributes": {
                    "resolution-ms": 60000,
                    "points-count": 2,
                    "time-windows": [
                        { "oldest-time": "2024-05-01T12:00:00.000Z", "youngest-time": "2024-05-01T12:01:00.000Z" },
                        { "oldest-time": "2024-05-01T12:01:00.000Z", "youngest-time": "2024-05-01T12:02:00.000Z" }
                    ],
                    "ops-counts": [10, 12],
                    "error-counts": [0, 1],
                    "latencies": [{ "percentile": 99.9, "latency-ms": [3.0, 12.5] }]
                }
            }
        }"#;

        let response = RawSeriesResponse::from_slice(body).unwrap();
        let attrs = &response.data.attributes;
        assert_eq!(response.data.id, "abc123");
        assert_eq!(attrs.points_count, 2);
        assert_eq!(attrs.resolution_ms, Some(60_000));
        assert_eq!(attrs.time_windows[1].youngest_time.timestamp(), 1_714_564_920);
        assert_eq!(attrs.latencies[0].percentile.to_string(), "99.9");
        assert_eq!(attrs.latencies[0].latency_ms[0].to_string(), "3.0");
        assert_eq!(attrs.ops_counts[1].to_string(), "12");
    }

    #[test]
    fn optional_arrays_default_to_empty() {
        let body = br#"{ "data": { "id": "x", "attributes": { "points-count": 0 } } }"#;
        let response = RawSeriesResponse::from_slice(body).unwrap();
        assert!(response.data.attributes.time_windows.is_empty());
        assert!(response.data.attributes.latencies.is_empty());
        assert_eq!(response.data.attributes.resolution_ms, None);
    }

    #[test]
    fn missing_points_count_is_rejected() {
        let body = br#"{ "data": { "id": "x", "attributes": {} } }"#;
        assert!(RawSeriesResponse::from_slice(body).is_err());
    }
}
