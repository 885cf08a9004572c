//! 배치 디스패처.
//!
//! 한 실행의 레코드 시퀀스를 `batch_size` 단위로 나눠 순서대로 압축/전송한다.
//! 배치 k가 재시도 후에도 실패하면 남은 배치는 버리고, 이미 수락된
//! 배치 1..k-1은 되돌리지 않는다 (at-least-once).

use lsbridge_core::error::DeliveryError;
use lsbridge_core::models::MetricRecord;
use lsbridge_core::ports::{Compressor, MetricSink};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::retry::RetryPolicy;

/// 연속된 최대 `size`개 단위로 분할 (빈 입력은 청크 없음)
pub fn partition(records: &[MetricRecord], size: usize) -> std::slice::Chunks<'_, MetricRecord> {
    records.chunks(size.max(1))
}

/// 레코드를 줄바꿈으로 연결한 페이로드
pub fn render_batch(batch: &[MetricRecord]) -> String {
    batch
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// 한 번의 디스패치 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 수락된 배치 수
    pub batches: usize,
    /// 수락된 레코드 수
    pub records: usize,
    /// 총 HTTP 시도 횟수 (재시도 포함)
    pub attempts: u32,
    /// 압축 후 전송 바이트 합계
    pub bytes_sent: usize,
}

/// 배치 디스패처: 분할 → 압축 → 재시도 전송
pub struct BatchDispatcher {
    sink: Arc<dyn MetricSink>,
    compressor: Arc<dyn Compressor>,
    batch_size: usize,
    policy: RetryPolicy,
}

impl BatchDispatcher {
    /// 새 디스패처 생성
    pub fn new(
        sink: Arc<dyn MetricSink>,
        compressor: Arc<dyn Compressor>,
        batch_size: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            sink,
            compressor,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 레코드 시퀀스 전송
    ///
    /// 배치는 분할 순서대로 하나씩 전송된다. 재시도 소진 시 `DeliveryError::Rejected`.
    pub async fn dispatch(&self, records: &[MetricRecord]) -> Result<DispatchReport, DeliveryError> {
        let mut report = DispatchReport::default();
        if records.is_empty() {
            debug!("전송할 레코드 없음");
            return Ok(report);
        }

        let total = records.len().div_ceil(self.batch_size);
        let encoding = self.compressor.encoding();

        for (index, batch) in partition(records, self.batch_size).enumerate() {
            let payload = render_batch(batch);
            let compressed = match self.compressor.compress(payload.as_bytes()) {
                Ok(compressed) => compressed,
                Err(e) => {
                    error!("배치 {}/{total} 압축 실패: {e}", index + 1);
                    return Err(DeliveryError::Rejected {
                        batch: index,
                        attempts: 0,
                        reason: e.to_string(),
                    });
                }
            };

            let sink = &self.sink;
            let body: &[u8] = &compressed;
            let tried = AtomicU32::new(0);
            let tried_ref = &tried;
            let attempts = match self
                .policy
                .execute(move |attempt| {
                    tried_ref.store(attempt, Ordering::Relaxed);
                    sink.send(body, encoding)
                })
                .await
            {
                Ok(()) => tried.load(Ordering::Relaxed),
                Err(e) => {
                    error!(
                        "배치 {}/{total} 전송 최종 실패 ({}회 시도): {}",
                        index + 1,
                        e.attempts,
                        e.last
                    );
                    return Err(DeliveryError::Rejected {
                        batch: index,
                        attempts: e.attempts,
                        reason: e.last.to_string(),
                    });
                }
            };

            report.batches += 1;
            report.records += batch.len();
            report.attempts += attempts;
            report.bytes_sent += compressed.len();
            debug!(
                "배치 {}/{total} 전송 완료: {}개 레코드, {} → {} bytes",
                index + 1,
                batch.len(),
                payload.len(),
                compressed.len()
            );
        }

        info!(
            "디스패치 완료: {}개 배치, {}개 레코드",
            report.batches, report.records
        );
        Ok(report)
    }
}
