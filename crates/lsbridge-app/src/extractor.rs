//! 타깃 추출기.
//!
//! 트리거 한 번 = 실행(run) 한 번: 시간 창 계산 → 검색별 조회(선언 순서) →
//! 인코딩 → 전체 시퀀스를 디스패처에 전달. 조회 하나라도 실패하면
//! 그때까지 모은 레코드도 버리고 실행 전체를 중단한다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lsbridge_core::config::EffectiveConfig;
use lsbridge_core::encoder::{encode_series, EncodeOptions};
use lsbridge_core::error::ExtractionError;
use lsbridge_core::models::{MetricRecord, TimeWindow};
use lsbridge_core::ports::{SeriesQuery, TimeseriesSource};
use lsbridge_network::batch_dispatcher::{BatchDispatcher, DispatchReport};
use lsbridge_network::compression::GzipCompressor;
use lsbridge_network::lightstep_client::LightstepClient;
use lsbridge_network::retry::RetryPolicy;
use lsbridge_network::sumo_client::SumoHttpSink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::scheduler::ScheduledJob;

/// 실행 한 번의 결과 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub window: TimeWindow,
    pub records: usize,
    pub report: DispatchReport,
}

/// 타깃 하나의 추출-인코딩-전송 파이프라인
pub struct TargetExtractor {
    config: EffectiveConfig,
    source: Arc<dyn TimeseriesSource>,
    dispatcher: BatchDispatcher,
}

impl TargetExtractor {
    /// 포트를 직접 주입해 생성
    pub fn new(
        config: EffectiveConfig,
        source: Arc<dyn TimeseriesSource>,
        dispatcher: BatchDispatcher,
    ) -> Self {
        Self {
            config,
            source,
            dispatcher,
        }
    }

    /// 설정으로부터 타깃 전용 HTTP 클라이언트 두 개를 만들어 생성
    pub fn connect(config: EffectiveConfig) -> Result<Self, ExtractionError> {
        let source = LightstepClient::new(
            config.lightstep_api_url.clone(),
            config.lightstep_api_key.clone(),
            config.request_timeout,
        )?;
        let sink = SumoHttpSink::new(
            config.sumo_http_url.clone(),
            &config.routing,
            config.request_timeout,
        )?;
        let dispatcher = BatchDispatcher::new(
            Arc::new(sink),
            Arc::new(GzipCompressor::new()),
            config.batch_size,
            RetryPolicy::new(config.retries, config.backoff_factor),
        );
        Ok(Self::new(config, Arc::new(source), dispatcher))
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// 현재 시각 기준 실행
    pub async fn run(&self) -> Result<(), ExtractionError> {
        self.run_at(Utc::now()).await.map(|_| ())
    }

    /// `now` 기준 실행
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary, ExtractionError> {
        let window = TimeWindow::ending_at(now, self.config.window_seconds);
        let records = self.collect(&window).await?;
        let report = self.dispatcher.dispatch(&records).await?;

        info!(
            "실행 완료: {}개 레코드, {}개 배치 ({} ~ {})",
            records.len(),
            report.batches,
            window.oldest_param(),
            window.youngest_param()
        );
        Ok(RunSummary {
            window,
            records: records.len(),
            report,
        })
    }

    /// 모든 검색을 선언 순서대로 조회해 레코드 시퀀스 생성
    async fn collect(&self, window: &TimeWindow) -> Result<Vec<MetricRecord>, ExtractionError> {
        let cfg = &self.config;
        let options = EncodeOptions {
            project: cfg.project.clone(),
            resolution_ms: cfg.resolution_ms,
            include_error_counts: cfg.include_error_counts,
            include_ops_counts: cfg.include_ops_counts,
        };

        let mut records = Vec::new();
        for search in &cfg.searches {
            let query = SeriesQuery {
                project: cfg.project.clone(),
                search: search.clone(),
                resolution_ms: cfg.resolution_ms,
                percentiles: cfg.percentiles.clone(),
                window: *window,
                include_ops_counts: cfg.include_ops_counts,
                include_error_counts: cfg.include_error_counts,
            };

            let response = self.source.fetch(&query).await?;
            let encoded =
                encode_series(&response, &options).map_err(|e| ExtractionError::ParseFailure {
                    search: search.clone(),
                    reason: e.to_string(),
                })?;
            debug!("검색 {search}: {}개 레코드", encoded.len());
            records.extend(encoded);
        }
        Ok(records)
    }
}

#[async_trait]
impl ScheduledJob for TargetExtractor {
    fn id(&self) -> &str {
        &self.config.project
    }

    fn period(&self) -> Duration {
        self.config.run_interval()
    }

    async fn run_once(&self) -> Result<(), ExtractionError> {
        self.run().await
    }
}
