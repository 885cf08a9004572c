//! # lsbridge
//!
//! Lightstep → Sumo Logic 메트릭 브리지 바이너리 진입점.
//! 설정 로드/검증, 타깃별 추출기 와이어링, 스케줄러 오케스트레이션.

mod extractor;
mod lifecycle;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use lsbridge_core::config_loader::{ConfigLoader, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::extractor::TargetExtractor;
use crate::lifecycle::LifecycleManager;
use crate::scheduler::{JobState, Scheduler};

/// Lightstep 타임시리즈를 Sumo Logic HTTP 소스로 전달하는 브리지
#[derive(Parser, Debug)]
#[command(name = "lsbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (JSON)
    #[arg(env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error; WARNING/CRITICAL 별칭 허용)
    #[arg(
        long,
        short = 'l',
        env = "LOGGING_LEVEL",
        default_value = "info",
        value_parser = parse_log_level
    )]
    log_level: String,

    /// 설정만 검증하고 종료
    #[arg(long)]
    check: bool,
}

/// 레벨 이름을 EnvFilter 지시어로 정규화
///
/// 운영 환경에서 흔한 WARNING, CRITICAL 같은 이름도 받는다.
fn parse_log_level(raw: &str) -> Result<String, String> {
    let level = match raw.trim().to_ascii_lowercase().as_str() {
        "trace" | "notset" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        _ => {
            return Err(format!(
                "알 수 없는 로그 레벨: {raw} (trace, debug, info, warn, error 중 하나)"
            ))
        }
    };
    Ok(level.to_string())
}

fn init_tracing(level: &str) {
    let log_filter = format!("lsbridge={level},lsbridge_core={level},lsbridge_network={level}");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_thread_names(true)
        .with_target(true)
        .with_line_number(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    // ── 설정 로드 (스케줄링 전에 전체 검증) ──
    let loader = ConfigLoader::new(args.config.clone());
    let configs = loader
        .load_effective()
        .with_context(|| format!("설정 검증 실패: {}", loader.config_path().display()))?;
    info!(
        "설정 로드 완료: {} ({}개 타깃)",
        loader.config_path().display(),
        configs.len()
    );

    if args.check {
        for config in &configs {
            println!("{config:#?}");
        }
        return Ok(());
    }

    // ── 타깃별 추출기 와이어링 ──
    let mut scheduler = Scheduler::new();
    for config in configs {
        let project = config.project.clone();
        let extractor = TargetExtractor::connect(config)
            .with_context(|| format!("타깃 초기화 실패: {project}"))?;
        let cfg = extractor.config();
        info!(
            "타깃 {}: 검색 {}개, 주기 {}s, 윈도우 {}s, 배치 {}",
            cfg.project,
            cfg.searches.len(),
            cfg.run_interval_seconds,
            cfg.window_seconds,
            cfg.batch_size
        );
        scheduler.add_job(Arc::new(extractor));
    }

    // ── 실행 ──
    let lifecycle = LifecycleManager::new();
    let scheduler = Arc::new(scheduler);
    let runner = {
        let scheduler = scheduler.clone();
        let shutdown_rx = lifecycle.subscribe();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };
    info!(
        "lsbridge 실행 중: {}개 작업 (Ctrl+C로 종료)",
        scheduler.job_count()
    );

    lifecycle.wait_for_signal().await;
    if let Err(e) = runner.await {
        warn!("스케줄러 태스크 종료 오류: {e}");
    }

    for snap in scheduler.snapshots() {
        let line = format!(
            "{}: 시작 {}, 성공 {}, 실패 {}, 건너뜀 {}",
            snap.id, snap.started, snap.succeeded, snap.failed, snap.skipped
        );
        match (snap.state, snap.last_error) {
            (JobState::Failed, Some(e)) => error!("{line} (마지막 오류: {e})"),
            _ => info!("{line}"),
        }
    }

    info!("lsbridge 종료");
    Ok(())
}
