//! 메트릭 라인 인코더.
//!
//! Lightstep 응답 한 건을 포인트 인덱스 순서(index-major)로 평탄화한다.
//! 인덱스마다 error-counts → ops-counts → 백분위별 latency-ms 순서로 레코드를 낸다.

use serde_json::Number;
use tracing::warn;

use crate::error::EncodeError;
use crate::models::{MetricKind, MetricRecord, RawSeriesResponse};

/// 인코딩에 필요한 타깃 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub project: String,
    pub resolution_ms: u64,
    pub include_error_counts: bool,
    pub include_ops_counts: bool,
}

fn ensure_len<T>(field: &str, values: &[T], points: usize) -> Result<(), EncodeError> {
    if values.len() < points {
        return Err(EncodeError::ShortArray {
            field: field.to_string(),
            len: values.len(),
            points,
        });
    }
    Ok(())
}

/// 응답 한 건을 레코드 목록으로 변환
///
/// 필요한 배열이 `points-count`보다 짧으면 응답 전체를 실패시킨다.
pub fn encode_series(
    response: &RawSeriesResponse,
    options: &EncodeOptions,
) -> Result<Vec<MetricRecord>, EncodeError> {
    let series_id = &response.data.id;
    let attrs = &response.data.attributes;
    let points = attrs.points_count;

    if let Some(actual) = attrs.resolution_ms {
        if actual != options.resolution_ms {
            warn!(
                "응답 해상도 불일치 (id={series_id}): 설정 {} != 응답 {actual}",
                options.resolution_ms
            );
        }
    }

    ensure_len("time-windows", &attrs.time_windows, points)?;
    if options.include_error_counts {
        ensure_len("error-counts", &attrs.error_counts, points)?;
    }
    if options.include_ops_counts {
        ensure_len("ops-counts", &attrs.ops_counts, points)?;
    }
    for latency in &attrs.latencies {
        ensure_len(
            &format!("latencies[percentile={}].latency-ms", latency.percentile),
            &latency.latency_ms,
            points,
        )?;
    }

    let per_point = usize::from(options.include_error_counts)
        + usize::from(options.include_ops_counts)
        + attrs.latencies.len();
    let mut records = Vec::with_capacity(points * per_point);

    let record = |kind: MetricKind, percentile: Option<&Number>, value: &Number, timestamp: i64| {
        MetricRecord {
            kind,
            project: options.project.clone(),
            series_id: series_id.clone(),
            resolution_ms: options.resolution_ms,
            percentile: percentile.cloned(),
            value: value.clone(),
            timestamp,
        }
    };

    for i in 0..points {
        let timestamp = attrs.time_windows[i].youngest_time.timestamp();

        if options.include_error_counts {
            records.push(record(MetricKind::ErrorCounts, None, &attrs.error_counts[i], timestamp));
        }
        if options.include_ops_counts {
            records.push(record(MetricKind::OpsCounts, None, &attrs.ops_counts[i], timestamp));
        }
        for latency in &attrs.latencies {
            records.push(record(
                MetricKind::LatencyMs,
                Some(&latency.percentile),
                &latency.latency_ms[i],
                timestamp,
            ));
        }
    }

    Ok(records)
}

/// JSON 본문을 디코딩한 뒤 인코딩
pub fn encode_body(body: &[u8], options: &EncodeOptions) -> Result<Vec<MetricRecord>, EncodeError> {
    let response =
        RawSeriesResponse::from_slice(body).map_err(|e| EncodeError::Decode(e.to_string()))?;
    encode_series(&response, options)
}
