//! 압축 포트.
//!
//! 구현: `lsbridge-network` crate (flate2)

use crate::error::DeliveryError;

/// 배치 페이로드 압축 인터페이스
pub trait Compressor: Send + Sync {
    /// `Content-Encoding` 헤더 값
    fn encoding(&self) -> &'static str;

    /// 데이터 압축
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, DeliveryError>;
}
