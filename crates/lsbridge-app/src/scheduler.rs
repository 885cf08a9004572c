//! 타깃별 스케줄러.
//!
//! 타깃마다 독립된 트리거 루프 하나. 주기는 각 타깃의 `run_interval_seconds`이고
//! 첫 실행은 시작 즉시. 이전 실행이 끝나지 않았으면 새 트리거는 건너뛴다
//! (대기열에 쌓거나 병렬로 돌리지 않음).

use async_trait::async_trait;
use futures::FutureExt;
use lsbridge_core::error::ExtractionError;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};

/// 최소 트리거 주기
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 스케줄러가 주기적으로 실행하는 작업
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// 작업 ID (타깃 프로젝트)
    fn id(&self) -> &str;

    /// 트리거 주기
    fn period(&self) -> Duration;

    /// 실행 한 번
    async fn run_once(&self) -> Result<(), ExtractionError>;
}

/// 작업 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    /// 직전 실행 실패 (다음 트리거에서 다시 실행)
    Failed,
}

/// 작업 통계 스냅샷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub id: String,
    pub state: JobState,
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub last_error: Option<String>,
}

struct RunSlot {
    state: JobState,
    last_error: Option<String>,
    current: Option<AbortHandle>,
}

/// 작업 하나의 상태 머신과 카운터
pub struct JobMonitor {
    id: String,
    slot: Mutex<RunSlot>,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl JobMonitor {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slot: Mutex::new(RunSlot {
                state: JobState::Idle,
                last_error: None,
                current: None,
            }),
            started: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Idle/Failed → Running. 이미 Running이면 건너뜀으로 집계하고 false.
    fn try_begin(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.state == JobState::Running {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        slot.state = JobState::Running;
        self.started.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn attach(&self, handle: AbortHandle) {
        let mut slot = self.slot.lock();
        if slot.state == JobState::Running {
            slot.current = Some(handle);
        }
    }

    fn finish(&self, result: Result<(), String>) {
        let mut slot = self.slot.lock();
        slot.current = None;
        match result {
            Ok(()) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                slot.state = JobState::Idle;
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                slot.state = JobState::Failed;
                slot.last_error = Some(e);
            }
        }
    }

    /// 진행 중인 실행 중단 (종료 시)
    fn abort_current(&self) {
        if let Some(handle) = self.slot.lock().current.take() {
            handle.abort();
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let slot = self.slot.lock();
        JobSnapshot {
            id: self.id.clone(),
            state: slot.state,
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            last_error: slot.last_error.clone(),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "알 수 없는 패닉".to_string())
}

/// 실행 한 번을 별도 태스크로 띄운다
fn spawn_run(job: Arc<dyn ScheduledJob>, monitor: Arc<JobMonitor>) {
    let span = info_span!("job", project = %job.id());
    let task_monitor = monitor.clone();
    let handle = tokio::spawn(
        async move {
            debug!("실행 시작");
            let outcome = AssertUnwindSafe(job.run_once()).catch_unwind().await;
            let result = match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    warn!("실행 실패: {e}");
                    Err(e.to_string())
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("실행 중 패닉: {message}");
                    Err(format!("패닉: {message}"))
                }
            };
            task_monitor.finish(result);
        }
        .instrument(span),
    );
    monitor.attach(handle.abort_handle());
}

// ============================================================
// 스케줄러
// ============================================================

/// 타깃별 독립 작업을 소유하는 스케줄러
pub struct Scheduler {
    jobs: Vec<(Arc<dyn ScheduledJob>, Arc<JobMonitor>)>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// 빈 스케줄러 생성
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            loops: Mutex::new(Vec::new()),
        }
    }

    /// 작업 등록 (start 전에)
    pub fn add_job(&mut self, job: Arc<dyn ScheduledJob>) -> Arc<JobMonitor> {
        let monitor = Arc::new(JobMonitor::new(job.id()));
        self.jobs.push((job, monitor.clone()));
        monitor
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// 작업별 트리거 루프 시작
    pub fn start(&self, shutdown_rx: watch::Receiver<bool>) {
        let mut loops = self.loops.lock();
        for (job, monitor) in &self.jobs {
            let job = job.clone();
            let monitor = monitor.clone();
            let mut shutdown = shutdown_rx.clone();
            let period = job.period().max(MIN_PERIOD);
            info!("작업 등록: {} (주기 {period:?})", job.id());

            loops.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if monitor.try_begin() {
                                spawn_run(job.clone(), monitor.clone());
                            } else {
                                debug!("{}: 이전 실행 진행 중, 트리거 건너뜀", monitor.id());
                            }
                        }
                        _ = shutdown.changed() => {
                            info!("{}: 트리거 루프 종료", monitor.id());
                            break;
                        }
                    }
                }
            }));
        }
    }

    /// 트리거 루프와 진행 중인 실행 중단
    pub fn shutdown(&self) {
        for handle in self.loops.lock().drain(..) {
            handle.abort();
        }
        for (_, monitor) in &self.jobs {
            monitor.abort_current();
        }
    }

    /// start → 종료 신호 대기 → shutdown
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        self.start(shutdown_rx.clone());
        let _ = shutdown_rx.changed().await;
        info!("스케줄러 종료 신호 수신");
        self.shutdown();
    }

    /// 작업별 통계
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.jobs.iter().map(|(_, m)| m.snapshot()).collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
