//! Lightstep 타임시리즈 조회 클라이언트.
//!
//! `TimeseriesSource` 포트 구현. 저장 검색 하나당 인증된 GET 한 번.
//! 조회는 재시도하지 않는다. 실패하면 해당 실행 전체가 중단된다.

use async_trait::async_trait;
use lsbridge_core::error::ExtractionError;
use lsbridge_core::models::RawSeriesResponse;
use lsbridge_core::ports::{SeriesQuery, TimeseriesSource};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// 로그/에러에 담을 응답 본문 최대 길이
const MAX_ERROR_BODY: usize = 512;

/// Lightstep 조회 클라이언트: `TimeseriesSource` 포트 구현
pub struct LightstepClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl LightstepClient {
    /// 새 조회 클라이언트 생성
    ///
    /// `base_url`은 프로젝트 경로 직전까지 (예: `.../public/v0.1/Sumologic/projects/`)
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        if base_url.cannot_be_a_base() {
            return Err(ExtractionError::Client(format!(
                "기본 URL로 쓸 수 없음: {base_url}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Client(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// `{base}/{project}/searches/{search}/timeseries`
    pub fn series_url(&self, project: &str, search: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([project, "searches", search, "timeseries"]);
        }
        url
    }
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}

#[async_trait]
impl TimeseriesSource for LightstepClient {
    async fn fetch(&self, query: &SeriesQuery) -> Result<RawSeriesResponse, ExtractionError> {
        let url = self.series_url(&query.project, &query.search);
        debug!("타임시리즈 조회: {url}");

        let upstream = |reason: String| ExtractionError::UpstreamFailure {
            search: query.search.clone(),
            reason,
        };

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| upstream(format!("요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_else(|e| {
                warn!("응답 본문 읽기 실패: {e}");
                String::new()
            });
            return Err(upstream(format!("HTTP {status}: {}", truncate(text))));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| upstream(format!("응답 본문 읽기 실패: {e}")))?;

        RawSeriesResponse::from_slice(&body).map_err(|e| ExtractionError::ParseFailure {
            search: query.search.clone(),
            reason: e.to_string(),
        })
    }
}
