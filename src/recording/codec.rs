// src/recording/codec.rs
//! Text-safe payload encoding
//!
//! Raw frames are stored as standard, padded base64 so they can be embedded
//! in a JSON export document and recovered byte for byte.

use crate::utils::errors::{ArchiveError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

/// Encode raw bytes into their text-safe form
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Recover the raw bytes from [`encode`] output
///
/// Fails on characters outside the base64 alphabet or on bad padding.
pub fn decode(text: &str) -> Result<Bytes> {
    STANDARD
        .decode(text)
        .map(Bytes::from)
        .map_err(|e| ArchiveError::MalformedEncoding(format!("Invalid base64 payload: {}", e)))
}
