// src/recording/mod.rs
//! Message capture and export
//!
//! This module turns a live stream of binary frames into bounded,
//! exportable archives:
//!
//! - **Codec**: Base64 payload encoding
//! - **Redactor**: Allow-list reduction of decoded messages
//! - **Store**: Bounded in-memory capture buffer
//! - **Document**: Export document model and JSON serializer
//! - **Archiver**: Lock-owning pipeline around the store
//! - **Scheduler**: Periodic auto-export timer
//! - **Sink**: Export destinations (memory, directory)
//! - **Storage**: SQLite index of written exports
//! - **Compressor**: zstd for on-disk documents
//! - **Inspector**: Per-method statistics for debugging
//!
//! # Architecture
//!
//! ```text
//! transport → Archiver::capture() → ArchiveStore (Vec, bounded)
//!                                        │
//!                    max_messages reached │ timer tick
//!                                        ▼
//!                          snapshot → JSON → ExportSink → reset
//!                                                  │
//!                                      DirectorySink writer thread
//!                                                  │
//!                                  file (.json / .json.zst) + SQLite row
//! ```

pub mod archiver;
pub mod codec;
pub mod compressor;
pub mod document;
pub mod inspector;
pub mod redactor;
pub mod scheduler;
pub mod sink;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use archiver::{ArchiveStats, Archiver, ArchiverBuilder, ExportReceipt};
pub use compressor::{CompressionLevel, Compressor};
pub use document::{extract_payload, ArchiveMetadata, CapturedEvent, ExportDocument, FORMAT_VERSION};
pub use inspector::{MessageInspector, MethodStat};
pub use redactor::{redact, Redactor};
pub use scheduler::{AutoExportScheduler, RepeatingTask};
pub use sink::{DirectorySink, ExportSink, MemorySink};
pub use storage::{ExportIndex, ExportRecord};
pub use store::{ArchiveStore, CaptureOutcome};
