//! carbon2 형식 메트릭 레코드.
//!
//! 한 레코드는 정확히 한 줄로 렌더링된다:
//!
//! ```text
//! metric=ops-counts project=checkout id=abc resolution-ms=60000  12 1714564920
//! metric=latency-ms project=checkout id=abc resolution-ms=60000 percentile=99.9  3.0 1714564920
//! ```
//!
//! 값 앞의 공백 두 칸까지 수신 측 파서가 의존하므로 바이트 단위로 유지해야 한다.
//! 프로젝트/ID 값은 이스케이프하지 않는다.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::str::FromStr;

use crate::error::RecordParseError;

/// 메트릭 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    ErrorCounts,
    OpsCounts,
    LatencyMs,
}

impl MetricKind {
    /// `metric=` 태그 값
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ErrorCounts => "error-counts",
            Self::OpsCounts => "ops-counts",
            Self::LatencyMs => "latency-ms",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error-counts" => Ok(Self::ErrorCounts),
            "ops-counts" => Ok(Self::OpsCounts),
            "latency-ms" => Ok(Self::LatencyMs),
            other => Err(RecordParseError::InvalidValue {
                field: "metric",
                value: other.to_string(),
            }),
        }
    }
}

/// 평탄화된 메트릭 관측값 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub kind: MetricKind,
    pub project: String,
    pub series_id: String,
    pub resolution_ms: u64,
    /// latency-ms 레코드에만 존재
    pub percentile: Option<Number>,
    pub value: Number,
    /// Unix 타임스탬프 (초)
    pub timestamp: i64,
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "metric={} project={} id={} resolution-ms={}",
            self.kind, self.project, self.series_id, self.resolution_ms
        )?;
        if let Some(percentile) = &self.percentile {
            write!(f, " percentile={percentile}")?;
        }
        write!(f, "  {} {}", self.value, self.timestamp)
    }
}

/// `key=value` 토큰에서 값 추출
fn tagged<'a>(token: Option<&'a str>, key: &'static str) -> Result<&'a str, RecordParseError> {
    token
        .and_then(|t| t.strip_prefix(key))
        .and_then(|t| t.strip_prefix('='))
        .ok_or(RecordParseError::MissingField(key))
}

fn invalid(field: &'static str, value: &str) -> RecordParseError {
    RecordParseError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

impl FromStr for MetricRecord {
    type Err = RecordParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (intrinsic, sample) = line
            .split_once("  ")
            .ok_or(RecordParseError::MissingField("value"))?;

        let mut tags = intrinsic.split(' ');
        let kind: MetricKind = tagged(tags.next(), "metric")?.parse()?;
        let project = tagged(tags.next(), "project")?.to_string();
        let series_id = tagged(tags.next(), "id")?.to_string();
        let raw_resolution = tagged(tags.next(), "resolution-ms")?;
        let resolution_ms = raw_resolution
            .parse::<u64>()
            .map_err(|_| invalid("resolution-ms", raw_resolution))?;

        let percentile = match tags.next() {
            Some(token) => {
                let raw = tagged(Some(token), "percentile")?;
                Some(Number::from_str(raw).map_err(|_| invalid("percentile", raw))?)
            }
            None => None,
        };
        if let Some(extra) = tags.next() {
            return Err(RecordParseError::Trailing(extra.to_string()));
        }
        match (kind, &percentile) {
            (MetricKind::LatencyMs, None) => return Err(RecordParseError::MissingField("percentile")),
            (MetricKind::ErrorCounts | MetricKind::OpsCounts, Some(p)) => {
                return Err(RecordParseError::Trailing(format!("percentile={p}")));
            }
            _ => {}
        }

        let mut fields = sample.split(' ');
        let raw_value = fields.next().ok_or(RecordParseError::MissingField("value"))?;
        let value = Number::from_str(raw_value).map_err(|_| invalid("value", raw_value))?;
        let raw_ts = fields
            .next()
            .ok_or(RecordParseError::MissingField("timestamp"))?;
        let timestamp = raw_ts.parse::<i64>().map_err(|_| invalid("timestamp", raw_ts))?;
        if let Some(extra) = fields.next() {
            return Err(RecordParseError::Trailing(extra.to_string()));
        }

        Ok(Self {
            kind,
            project,
            series_id,
            resolution_ms,
            percentile,
            value,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(raw: &str) -> Number {
        Number::from_str(raw).unwrap()
    }

    fn latency() -> MetricRecord {
        MetricRecord {
            kind: MetricKind::LatencyMs,
            project: "checkout".to_string(),
            series_id: "abc123".to_string(),
            resolution_ms: 60_000,
            percentile: Some(num("99.9")),
            value: num("3.0"),
            timestamp: 1_714_564_920,
        }
    }

    #[test]
    fn renders_exact_layout() {
        assert_eq!(
            latency().to_string(),
            "metric=latency-ms project=checkout id=abc123 resolution-ms=60000 percentile=99.9  3.0 1714564920"
        );

        let ops = MetricRecord {
            kind: MetricKind::OpsCounts,
            percentile: None,
            value: num("12"),
            ..latency()
        };
        assert_eq!(
            ops.to_string(),
            "metric=ops-counts project=checkout id=abc123 resolution-ms=60000  12 1714564920"
        );
    }

    #[test]
    fn parses_rendered_line_back() {
        let original = latency();
        let parsed: MetricRecord = original.to_string().parse().unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.value.to_string(), "3.0");

        let errors = MetricRecord {
            kind: MetricKind::ErrorCounts,
            percentile: None,
            value: num("0"),
            ..latency()
        };
        let parsed: MetricRecord = errors.to_string().parse().unwrap();
        assert_eq!(parsed.kind, MetricKind::ErrorCounts);
        assert_eq!(parsed.percentile, None);
    }

    #[test]
    fn rejects_malformed_lines() {
        let single_space = "metric=ops-counts project=p id=i resolution-ms=60000 12 1";
        assert_eq!(
            single_space.parse::<MetricRecord>(),
            Err(RecordParseError::MissingField("value"))
        );

        let bad_kind = "metric=cpu project=p id=i resolution-ms=60000  12 1";
        assert!(matches!(
            bad_kind.parse::<MetricRecord>(),
            Err(RecordParseError::InvalidValue { field: "metric", .. })
        ));

        let latency_without_percentile = "metric=latency-ms project=p id=i resolution-ms=60000  12 1";
        assert_eq!(
            latency_without_percentile.parse::<MetricRecord>(),
            Err(RecordParseError::MissingField("percentile"))
        );

        let bad_timestamp = "metric=ops-counts project=p id=i resolution-ms=60000  12 soon";
        assert!(matches!(
            bad_timestamp.parse::<MetricRecord>(),
            Err(RecordParseError::InvalidValue { field: "timestamp", .. })
        ));
    }
}
