//! Sumo Logic HTTP 소스 전송 클라이언트.
//!
//! `MetricSink` 포트 구현. 압축된 carbon2 배치를 POST 한 번으로 전송한다.

use async_trait::async_trait;
use lsbridge_core::config::SourceRouting;
use lsbridge_core::error::DeliveryError;
use lsbridge_core::ports::MetricSink;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// carbon2 라인 형식 content-type
pub const CARBON2_CONTENT_TYPE: &str = "application/vnd.sumologic.carbon2";

/// 라우팅 설정 키 → 요청 헤더 (X-Source-Category 등)
const ROUTING_HEADERS: [(&str, &str); 5] = [
    ("source_category", "x-source-category"),
    ("source_name", "x-source-name"),
    ("source_host", "x-source-host"),
    ("metadata", "x-source-metadata"),
    ("dimensions", "x-source-dimensions"),
];

/// 값이 있는 라우팅 필드만 헤더로 변환
pub fn routing_headers(routing: &SourceRouting) -> Result<HeaderMap, DeliveryError> {
    let mut headers = HeaderMap::new();
    for (key, value) in routing.entries() {
        let Some((_, header)) = ROUTING_HEADERS.iter().find(|(k, _)| *k == key) else {
            continue;
        };
        let value = HeaderValue::from_str(value)
            .map_err(|e| DeliveryError::Transport(format!("잘못된 헤더 값 ({key}): {e}")))?;
        headers.insert(HeaderName::from_static(*header), value);
    }
    Ok(headers)
}

/// Sumo HTTP 소스 클라이언트: `MetricSink` 포트 구현
pub struct SumoHttpSink {
    client: reqwest::Client,
    url: Url,
    headers: HeaderMap,
}

impl SumoHttpSink {
    /// 새 전송 클라이언트 생성
    pub fn new(url: Url, routing: &SourceRouting, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        let mut headers = routing_headers(routing)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CARBON2_CONTENT_TYPE));

        Ok(Self {
            client,
            url,
            headers,
        })
    }

    /// 요청마다 붙는 고정 헤더 (Content-Encoding 제외)
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl MetricSink for SumoHttpSink {
    async fn send(&self, payload: &[u8], content_encoding: &str) -> Result<(), DeliveryError> {
        let encoding = HeaderValue::from_str(content_encoding)
            .map_err(|e| DeliveryError::Transport(format!("잘못된 Content-Encoding: {e}")))?;

        let resp = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(CONTENT_ENCODING, encoding)
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(format!("수집 요청 실패: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            debug!("배치 수락: {} bytes ({status})", payload.len());
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn routing() -> SourceRouting {
        SourceRouting {
            source_category: Some("lightstep/metrics".to_string()),
            source_host: Some("bridge-01".to_string()),
            ..SourceRouting::default()
        }
    }

    fn sink_for(server: &mockito::ServerGuard, routing: &SourceRouting) -> SumoHttpSink {
        let url = Url::parse(&format!("{}/receiver/v1/http/token", server.url())).unwrap();
        SumoHttpSink::new(url, routing, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn maps_only_present_routing_fields() {
        let headers = routing_headers(&routing()).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-source-category"], "lightstep/metrics");
        assert_eq!(headers["x-source-host"], "bridge-01");
        assert!(headers.get("x-source-name").is_none());

        let all = SourceRouting {
            source_category: Some("c".to_string()),
            source_name: Some("n".to_string()),
            source_host: Some("h".to_string()),
            metadata: Some("team=obs".to_string()),
            dimensions: Some("env=prod".to_string()),
        };
        let headers = routing_headers(&all).unwrap();
        assert_eq!(headers["x-source-metadata"], "team=obs");
        assert_eq!(headers["x-source-dimensions"], "env=prod");
        assert_eq!(headers["x-source-name"], "n");
    }

    #[test]
    fn rejects_unrepresentable_header_value() {
        let bad = SourceRouting {
            source_name: Some("line\nbreak".to_string()),
            ..SourceRouting::default()
        };
        assert!(matches!(
            routing_headers(&bad),
            Err(DeliveryError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn posts_with_format_and_routing_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/receiver/v1/http/token")
            .match_header("content-type", CARBON2_CONTENT_TYPE)
            .match_header("content-encoding", "gzip")
            .match_header("x-source-category", "lightstep/metrics")
            .match_header("x-source-host", "bridge-01")
            .match_header("x-source-name", Matcher::Missing)
            .match_body("payload")
            .with_status(200)
            .create_async()
            .await;

        let sink = sink_for(&server, &routing());
        sink.send(b"payload", "gzip").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_maps_to_status_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/receiver/v1/http/token")
            .with_status(503)
            .with_body("throttled")
            .create_async()
            .await;

        let sink = sink_for(&server, &SourceRouting::default());
        let err = sink.send(b"x", "gzip").await.unwrap_err();
        match &err {
            DeliveryError::Status { status, body } => {
                assert_eq!(*status, 503);
                assert_eq!(body, "throttled");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let url = Url::parse("http://127.0.0.1:1/receiver").unwrap();
        let sink = SumoHttpSink::new(url, &SourceRouting::default(), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            sink.send(b"x", "gzip").await,
            Err(DeliveryError::Transport(_))
        ));
    }
}
