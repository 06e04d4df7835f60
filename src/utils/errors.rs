// src/utils/errors.rs
//! Error types for the archiver

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Archiver errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Payload text is not valid base64
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Export document text could not be parsed, or its metadata is unusable
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A caller-supplied argument violates an operation's precondition
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Sink failed: {0}")]
    SinkFailed(String),

    #[error("Storage failed: {0}")]
    StorageFailed(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArchiveError::PreconditionFailed("speed must be positive".into());
        assert_eq!(err.to_string(), "Precondition failed: speed must be positive");

        let err = ArchiveError::MalformedEncoding("invalid byte".into());
        assert!(err.to_string().starts_with("Malformed encoding"));
    }
}
