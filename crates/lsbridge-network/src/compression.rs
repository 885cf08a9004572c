//! gzip 압축 어댑터.
//!
//! `Compressor` 포트 구현. 배치 페이로드는 가장 빠른 레벨로 압축한다.

use flate2::read::GzEncoder;
use flate2::Compression;
use lsbridge_core::error::DeliveryError;
use lsbridge_core::ports::Compressor;
use std::io::Read;

/// gzip 압축기: `Compressor` 포트 구현
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    /// 가장 빠른 레벨(1)의 압축기
    pub fn new() -> Self {
        Self {
            level: Compression::fast(),
        }
    }

    /// 압축 레벨 지정 (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for GzipCompressor {
    fn encoding(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, DeliveryError> {
        let mut encoder = GzEncoder::new(data, self.level);
        let mut compressed = Vec::new();
        encoder
            .read_to_end(&mut compressed)
            .map_err(|e| DeliveryError::Compression(format!("gzip 압축 실패: {e}")))?;
        Ok(compressed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    /// 테스트용 gzip 해제
    pub(crate) fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decompressed = Vec::new();
        GzDecoder::new(data).read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }

    #[test]
    fn gzip_roundtrip() {
        let compressor = GzipCompressor::new();
        let data = b"metric=ops-counts project=p id=i resolution-ms=60000  12 1714564920";
        let compressed = compressor.compress(data).unwrap();
        // gzip 매직 바이트
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip(&compressed).unwrap(), data.to_vec());
    }

    #[test]
    fn repetitive_batch_shrinks() {
        let compressor = GzipCompressor::default();
        let line = "metric=latency-ms project=checkout id=abc resolution-ms=60000 percentile=99.9  3.0 1714564920\n";
        let data = line.repeat(500);
        let compressed = compressor.compress(data.as_bytes()).unwrap();
        assert!(compressed.len() < data.len() / 10);
    }

    #[test]
    fn empty_input() {
        let compressor = GzipCompressor::with_level(6);
        let compressed = compressor.compress(b"").unwrap();
        assert!(gunzip(&compressed).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_not_gzip() {
        assert!(gunzip(b"not gzip at all").is_err());
    }
}
