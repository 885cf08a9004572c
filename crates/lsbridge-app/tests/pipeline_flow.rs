//! 조회 → 인코딩 → 배치 전송 파이프라인 통합 테스트.
//!
//! mockito로 Lightstep/Sumo 엔드포인트를 모의하고 core + network 어댑터를 조립한다.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;
use lsbridge_core::encoder::{encode_series, EncodeOptions};
use lsbridge_core::error::DeliveryError;
use lsbridge_core::models::{MetricKind, MetricRecord, TimeWindow};
use lsbridge_core::ports::{MetricSink, SeriesQuery, TimeseriesSource};
use lsbridge_core::config::SourceRouting;
use lsbridge_network::batch_dispatcher::BatchDispatcher;
use lsbridge_network::compression::GzipCompressor;
use lsbridge_network::lightstep_client::LightstepClient;
use lsbridge_network::retry::RetryPolicy;
use lsbridge_network::sumo_client::{SumoHttpSink, CARBON2_CONTENT_TYPE};
use mockito::Matcher;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const SERIES_PATH: &str = "/public/v0.1/Sumologic/projects/checkout/searches/latency/timeseries";

const SERIES_BODY: &str = r#"{
    "data": {
        "id": "series-9",
        "attributes": {
            "resolution-ms": 60000,
            "points-count": 3,
            "time-windows": [
                { "oldest-time": "2024-05-01T12:31:00Z", "youngest-time": "2024-05-01T12:32:00Z" },
                { "oldest-time": "2024-05-01T12:32:00Z", "youngest-time": "2024-05-01T12:33:00Z" },
                { "oldest-time": "2024-05-01T12:33:00Z", "youngest-time": "2024-05-01T12:34:00Z" }
            ],
            "error-counts": [0, 2, 1],
            "ops-counts": [40, 42, 41],
            "latencies": [
                { "percentile": 99.0, "latency-ms": [120.5, 3.0, 98] }
            ]
        }
    }
}"#;

/// 압축 해제한 페이로드를 기록하는 Mock
#[derive(Default)]
struct RecordingSink {
    payloads: Mutex<Vec<String>>,
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn send(&self, payload: &[u8], content_encoding: &str) -> Result<(), DeliveryError> {
        assert_eq!(content_encoding, "gzip");
        let mut text = String::new();
        GzDecoder::new(payload).read_to_string(&mut text).unwrap();
        self.payloads.lock().push(text);
        Ok(())
    }
}

fn query() -> SeriesQuery {
    SeriesQuery {
        project: "checkout".to_string(),
        search: "latency".to_string(),
        resolution_ms: 60_000,
        percentiles: vec![99.0],
        window: TimeWindow::ending_at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 17).unwrap(), 180),
        include_ops_counts: true,
        include_error_counts: true,
    }
}

fn options() -> EncodeOptions {
    EncodeOptions {
        project: "checkout".to_string(),
        resolution_ms: 60_000,
        include_error_counts: true,
        include_ops_counts: true,
    }
}

async fn lightstep_mock(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("GET", SERIES_PATH)
        .match_header("authorization", "Bearer ls-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("oldest-time".into(), "2024-05-01T12:31:00+00:00".into()),
            Matcher::UrlEncoded("youngest-time".into(), "2024-05-01T12:34:00+00:00".into()),
            Matcher::UrlEncoded("percentile".into(), "99.0".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SERIES_BODY)
        .create_async()
        .await
}

async fn fetch_records(server: &mockito::ServerGuard) -> Vec<MetricRecord> {
    let base = Url::parse(&format!("{}/public/v0.1/Sumologic/projects/", server.url())).unwrap();
    let client = LightstepClient::new(base, "ls-key", Duration::from_secs(5)).unwrap();
    let response = client.fetch(&query()).await.unwrap();
    encode_series(&response, &options()).unwrap()
}

#[tokio::test]
async fn fetched_series_becomes_ordered_carbon2_batches() {
    let mut server = mockito::Server::new_async().await;
    let mock = lightstep_mock(&mut server).await;

    let records = fetch_records(&server).await;
    mock.assert_async().await;

    // 3 포인트 × (error, ops, p99)
    assert_eq!(records.len(), 9);
    let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        &kinds[..3],
        &[MetricKind::ErrorCounts, MetricKind::OpsCounts, MetricKind::LatencyMs]
    );

    let sink = Arc::new(RecordingSink::default());
    let dispatcher = BatchDispatcher::new(
        sink.clone(),
        Arc::new(GzipCompressor::new()),
        4,
        RetryPolicy::new(1, 0.0),
    );
    let report = dispatcher.dispatch(&records).await.unwrap();
    assert_eq!(report.batches, 3);
    assert_eq!(report.records, 9);

    let payloads = sink.payloads.lock().clone();
    let lines: Vec<&str> = payloads.iter().flat_map(|p| p.lines()).collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(
        lines[0],
        "metric=error-counts project=checkout id=series-9 resolution-ms=60000  0 1714566720"
    );
    assert_eq!(
        lines[2],
        "metric=latency-ms project=checkout id=series-9 resolution-ms=60000 percentile=99.0  120.5 1714566720"
    );
    assert_eq!(
        lines[5],
        "metric=latency-ms project=checkout id=series-9 resolution-ms=60000 percentile=99.0  3.0 1714566780"
    );
    assert_eq!(
        lines[8],
        "metric=latency-ms project=checkout id=series-9 resolution-ms=60000 percentile=99.0  98 1714566840"
    );

    // 전송된 줄은 다시 레코드로 파싱된다
    let reparsed: Vec<MetricRecord> = lines.iter().map(|l| l.parse().unwrap()).collect();
    assert_eq!(reparsed, records);
}

#[tokio::test]
async fn batches_are_posted_to_sumo_with_routing_headers() {
    let mut lightstep = mockito::Server::new_async().await;
    let _ls = lightstep_mock(&mut lightstep).await;
    let records = fetch_records(&lightstep).await;

    let mut sumo = mockito::Server::new_async().await;
    let ingest = sumo
        .mock("POST", "/receiver/v1/http/token")
        .match_header("content-type", CARBON2_CONTENT_TYPE)
        .match_header("content-encoding", "gzip")
        .match_header("x-source-category", "lightstep/metrics")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let routing = SourceRouting {
        source_category: Some("lightstep/metrics".to_string()),
        ..SourceRouting::default()
    };
    let url = Url::parse(&format!("{}/receiver/v1/http/token", sumo.url())).unwrap();
    let sink = SumoHttpSink::new(url, &routing, Duration::from_secs(5)).unwrap();
    let dispatcher = BatchDispatcher::new(
        Arc::new(sink),
        Arc::new(GzipCompressor::new()),
        5,
        RetryPolicy::new(1, 0.0),
    );

    let report = dispatcher.dispatch(&records).await.unwrap();
    assert_eq!(report.batches, 2);
    assert_eq!(report.attempts, 2);
    assert!(report.bytes_sent > 0);
    ingest.assert_async().await;
}

#[tokio::test]
async fn excluded_counts_are_neither_requested_nor_encoded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", SERIES_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("include-ops-counts".into(), "1".into()),
            Matcher::UrlEncoded("include-error-counts".into(), "0".into()),
        ]))
        .with_status(200)
        .with_body(SERIES_BODY)
        .create_async()
        .await;

    let base = Url::parse(&format!("{}/public/v0.1/Sumologic/projects/", server.url())).unwrap();
    let client = LightstepClient::new(base, "ls-key", Duration::from_secs(5)).unwrap();
    let query = SeriesQuery {
        include_error_counts: false,
        ..query()
    };
    let response = client.fetch(&query).await.unwrap();
    mock.assert_async().await;

    let records = encode_series(
        &response,
        &EncodeOptions {
            include_error_counts: false,
            ..options()
        },
    )
    .unwrap();
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.kind != MetricKind::ErrorCounts));
}
