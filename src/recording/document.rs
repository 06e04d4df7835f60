// src/recording/document.rs
//! Export document model and JSON serializer
//!
//! Wire shape (camelCase keys, optional fields omitted when absent):
//!
//! ```text
//! {
//!   "metadata": { "roomNum", "roomId", "startTime", "endTime"?, "messageCount", "version" },
//!   "messages": [ { "timestamp", "method", "msgId", "displayId"?, "payload", "decoded"? } ]
//! }
//! ```

use crate::recording::codec;
use crate::recording::compressor::Compressor;
use crate::utils::errors::{ArchiveError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Schema version written into every export document
pub const FORMAT_VERSION: &str = "1.0.0";

/// Major schema version this build can replay
const SUPPORTED_MAJOR: u64 = 1;

/// One captured message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedEvent {
    /// Capture time (milliseconds since epoch)
    pub timestamp: i64,

    /// Message type tag
    pub method: String,

    /// Correlation id from the transport
    pub msg_id: String,

    /// Originating user, absent for system messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,

    /// Base64 of the raw frame
    pub payload: String,

    /// Redacted decoded copy, only when decoded retention is on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded: Option<serde_json::Value>,
}

impl CapturedEvent {
    /// Decode the raw frame bytes
    pub fn raw_bytes(&self) -> Result<Bytes> {
        codec::decode(&self.payload)
    }
}

/// Recover the raw frame bytes of an archived message
pub fn extract_payload(event: &CapturedEvent) -> Result<Bytes> {
    event.raw_bytes()
}

/// Session identifiers and running counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    pub room_num: String,
    pub room_id: String,

    /// Start of the current capture window (milliseconds since epoch)
    pub start_time: i64,

    /// Stamped on snapshots only; absent while capture is in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,

    pub message_count: u64,
    pub version: String,
}

impl ArchiveMetadata {
    pub fn new(room_num: impl Into<String>, room_id: impl Into<String>, start_time: i64) -> Self {
        Self {
            room_num: room_num.into(),
            room_id: room_id.into(),
            start_time,
            end_time: None,
            message_count: 0,
            version: FORMAT_VERSION.to_string(),
        }
    }
}

/// Detached snapshot of an archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ArchiveMetadata,

    /// Capture order
    pub messages: Vec<CapturedEvent>,
}

impl ExportDocument {
    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ArchiveError::ExportFailed(format!("JSON serialization error: {}", e)))
    }

    /// Parse and validate a document
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: ExportDocument = serde_json::from_str(text)
            .map_err(|e| ArchiveError::ParseError(format!("Invalid export document: {}", e)))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Load from disk, decompressing `.zst` files
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            ArchiveError::StorageFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let data = if path.extension().is_some_and(|ext| ext == "zst") {
            Compressor::default().decompress(&data)?
        } else {
            data
        };

        let text = String::from_utf8(data).map_err(|e| {
            ArchiveError::ParseError(format!("{} is not UTF-8: {}", path.display(), e))
        })?;

        debug!("Loaded export document from {}", path.display());
        Self::from_json(&text)
    }

    /// Check that the metadata describes a schema this build understands
    ///
    /// The version must be `MAJOR.MINOR.PATCH` with numeric parts and a
    /// supported major.
    pub fn validate(&self) -> Result<()> {
        let version = &self.metadata.version;
        let parts: Option<Vec<u64>> = version.split('.').map(|p| p.parse().ok()).collect();

        match parts.as_deref() {
            Some([major, _, _]) if *major == SUPPORTED_MAJOR => Ok(()),
            Some([_, _, _]) => Err(ArchiveError::ParseError(format!(
                "Unsupported document version {:?}",
                version
            ))),
            _ => Err(ArchiveError::ParseError(format!(
                "Malformed document version {:?}",
                version
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Serialize a document to JSON text
pub fn serialize(doc: &ExportDocument) -> Result<String> {
    doc.to_json()
}

/// Parse JSON text into a document
pub fn deserialize(text: &str) -> Result<ExportDocument> {
    ExportDocument::from_json(text)
}
