//! gzip 압축 어댑터.
//!
//! `Compressor` 포트 구현. 텔레메트리 본문은 항상 gzip으로 보낸다.

use flagmetry_core::error::CoreError;
use flagmetry_core::ports::compressor::Compressor;
use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::Read;

/// gzip 압축기: `Compressor` 포트 구현
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    /// 기본 압축 레벨로 생성
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
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
    fn content_encoding(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CoreError> {
        let mut encoder = GzEncoder::new(data, self.level);
        let mut compressed = Vec::new();
        encoder
            .read_to_end(&mut compressed)
            .map_err(|e| CoreError::Internal(format!("gzip 압축 실패: {e}")))?;
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CoreError> {
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| CoreError::Internal(format!("gzip 해제 실패: {e}")))?;
        Ok(decompressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_roundtrip() {
        let compressor = GzipCompressor::new();
        let data = br#"{"request_id":"abc","enabled_metrics":[]}"#;
        let compressed = compressor.compress(data).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]); // gzip 매직 넘버
        assert_eq!(compressor.decompress(&compressed).unwrap(), data.to_vec());
    }

    #[test]
    fn repetitive_payload_shrinks() {
        let compressor = GzipCompressor::with_level(9);
        let data: Vec<u8> = br#"{"key":"search","time":1696793160,"result":true,"value":10},"#
            .iter()
            .cycle()
            .take(10_000)
            .copied()
            .collect();
        let compressed = compressor.compress(&data).unwrap();
        assert!(compressed.len() < data.len() / 10);
    }

    #[test]
    fn content_encoding_is_gzip() {
        assert_eq!(GzipCompressor::default().content_encoding(), "gzip");
    }

    #[test]
    fn corrupted_data() {
        let compressor = GzipCompressor::new();
        let corrupted = vec![0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03];
        assert!(compressor.decompress(&corrupted).is_err());
    }
}
