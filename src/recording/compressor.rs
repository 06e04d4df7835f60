// src/recording/compressor.rs
//! zstd compression for export documents
//!
//! JSON documents full of base64 payloads shrink well; the directory sink
//! compresses them when `sink.compress` is set.

use crate::utils::errors::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Compression levels, configured as `sink.compression_level`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Level 1
    Fast,

    /// Level 3
    #[default]
    Balanced,

    /// Level 19
    Best,
}

impl CompressionLevel {
    pub fn as_i32(&self) -> i32 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Balanced => 3,
            CompressionLevel::Best => 19,
        }
    }
}

/// Compressor using zstd
#[derive(Debug, Clone, Copy, Default)]
pub struct Compressor {
    level: CompressionLevel,
}

impl Compressor {
    pub fn new(level: CompressionLevel) -> Self {
        Self { level }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let level = self.level.as_i32();

        let compressed = zstd::encode_all(data, level).map_err(|e| {
            ArchiveError::CompressionFailed(format!("Compression error: {}", e))
        })?;

        debug!(
            "Compressed {} bytes -> {} bytes at level {}",
            data.len(),
            compressed.len(),
            level
        );

        Ok(compressed)
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| {
            ArchiveError::CompressionFailed(format!("Decompression error: {}", e))
        })
    }
}
