//! 메트릭 수집 엔드포인트 포트.
//!
//! 구현: `lsbridge-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::DeliveryError;

/// 압축된 배치 페이로드 전송
///
/// 한 번의 호출은 한 번의 HTTP 시도다. 재시도는 호출자가 담당한다.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// `content_encoding`은 페이로드에 적용된 압축 (예: "gzip")
    async fn send(&self, payload: &[u8], content_encoding: &str) -> Result<(), DeliveryError>;
}
