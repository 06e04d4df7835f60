// src/lib.rs
//! Feed Archiver Library
//!
//! Captures a live stream of binary-encoded session messages, bounds the
//! in-memory buffer through threshold and periodic exports, and replays
//! exported sessions with their original relative timing.
//!
//! # Architecture
//!
//! The crate is structured into several key modules:
//!
//! - **recording**: Capture, redaction, export documents, sinks
//! - **replay**: Timed replay and offline analysis
//! - **observability**: Tracing, metrics, and the reporter collaborator
//! - **utils**: Configuration, errors, and time helpers
//!
//! # Example
//!
//! ```no_run
//! use feed_archiver::recording::{Archiver, MemorySink};
//! use feed_archiver::utils::config::ArchiverConfig;
//!
//! # fn main() -> feed_archiver::Result<()> {
//! let sink = MemorySink::new();
//! let archiver = Archiver::builder("7001", "room-abc", sink.clone())
//!     .config(ArchiverConfig { enabled: true, max_messages: 500, ..Default::default() })
//!     .build()?;
//!
//! archiver.capture("WebcastChatMessage", "msg-1", &[0x0a, 0x02, 0x68, 0x69], None, Some("user42"));
//! # Ok(())
//! # }
//! ```

pub mod observability;
pub mod recording;
pub mod replay;
pub mod utils;

// Re-export commonly used types
pub use observability::{ArchiveEvent, Reporter, TracingReporter};
pub use recording::{Archiver, CapturedEvent, ExportDocument, ExportSink};
pub use replay::{analyze, replay, ReplayOptions, Replayer};
pub use utils::config::AppConfig;
pub use utils::errors::{ArchiveError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Crate build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = BuildInfo::current();
        assert!(!info.version.is_empty());
        assert!(!info.git_hash.is_empty());
    }
}
