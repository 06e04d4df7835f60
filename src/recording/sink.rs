// src/recording/sink.rs
//! Destinations for export documents
//!
//! The archiver treats a sink as fire-and-forget: [`ExportSink::submit`]
//! must return quickly and must not wait for the document to be durable.
//!
//! # Architecture
//!
//! ```text
//! Archiver ──submit()──▶ crossbeam channel ──▶ writer thread
//!                                                 │
//!                                   (optional) zstd compress
//!                                                 │
//!                                   file in output_dir + SQLite row
//! ```

use crate::recording::compressor::Compressor;
use crate::recording::storage::{ExportIndex, ExportRecord, IndexStats};
use crate::utils::config::SinkConfig;
use crate::utils::errors::{ArchiveError, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Receives serialized export documents
pub trait ExportSink: Send + Sync {
    /// Hand off `document` under `file_name`
    ///
    /// An `Err` means the hand-off itself failed. Failures after hand-off
    /// are the sink's own business.
    fn submit(&self, file_name: &str, document: String) -> Result<()>;
}

/// A document handed to a [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub struct SinkedDocument {
    pub file_name: String,
    pub document: String,
}

/// Keeps submitted documents in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<SinkedDocument>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn documents(&self) -> Vec<SinkedDocument> {
        self.documents.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }

    /// Remove and return everything submitted so far
    pub fn drain(&self) -> Vec<SinkedDocument> {
        std::mem::take(&mut *self.documents.lock())
    }
}

impl ExportSink for MemorySink {
    fn submit(&self, file_name: &str, document: String) -> Result<()> {
        self.documents.lock().push(SinkedDocument {
            file_name: file_name.to_string(),
            document,
        });
        Ok(())
    }
}

struct WriteJob {
    file_name: String,
    document: String,
}

/// Writes documents to a directory from a background thread
pub struct DirectorySink {
    output_dir: PathBuf,
    tx: Mutex<Option<Sender<WriteJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    index: Arc<Mutex<ExportIndex>>,
    written: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl DirectorySink {
    /// Create the output directory and index, then start the writer thread
    pub fn new(config: SinkConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir).map_err(|e| {
            ArchiveError::StorageFailed(format!(
                "Failed to create {}: {}",
                config.output_dir.display(),
                e
            ))
        })?;

        let index = Arc::new(Mutex::new(ExportIndex::open(
            config.output_dir.join(&config.index_db),
        )?));
        let written = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let (tx, rx) = crossbeam_channel::unbounded();

        let worker = Writer {
            output_dir: config.output_dir.clone(),
            compressor: config
                .compress
                .then(|| Compressor::new(config.compression_level)),
            index: Arc::clone(&index),
            written: Arc::clone(&written),
            failed: Arc::clone(&failed),
        };

        let handle = std::thread::Builder::new()
            .name("feed-archiver-sink".to_string())
            .spawn(move || worker.run(rx))
            .map_err(|e| ArchiveError::SinkFailed(format!("Failed to spawn writer: {}", e)))?;

        info!("Directory sink writing to {}", config.output_dir.display());

        Ok(Self {
            output_dir: config.output_dir,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            index,
            written,
            failed,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Stop accepting documents and wait for queued writes to finish
    pub fn close(&self) {
        drop(self.tx.lock().take());

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("Sink writer thread panicked");
            }
        }
    }

    pub fn list_exports(&self) -> Result<Vec<ExportRecord>> {
        self.index.lock().list()
    }

    pub fn index_stats(&self) -> Result<IndexStats> {
        self.index.lock().stats()
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl ExportSink for DirectorySink {
    fn submit(&self, file_name: &str, document: String) -> Result<()> {
        let tx = self.tx.lock();
        let tx = tx
            .as_ref()
            .ok_or_else(|| ArchiveError::SinkFailed("Sink is closed".to_string()))?;

        tx.send(WriteJob {
            file_name: file_name.to_string(),
            document,
        })
        .map_err(|_| ArchiveError::SinkFailed("Sink writer has stopped".to_string()))
    }
}

impl Drop for DirectorySink {
    fn drop(&mut self) {
        self.close();
    }
}

struct Writer {
    output_dir: PathBuf,
    compressor: Option<Compressor>,
    index: Arc<Mutex<ExportIndex>>,
    written: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl Writer {
    fn run(self, rx: Receiver<WriteJob>) {
        for job in rx {
            match self.write(&job) {
                Ok(()) => {
                    self.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!("Failed to write export {}: {}", job.file_name, e);
                    self.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        debug!("Sink writer stopped");
    }

    fn write(&self, job: &WriteJob) -> Result<()> {
        // Hints may carry directories; only the final component is used.
        let base = Path::new(&job.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ArchiveError::SinkFailed(format!("Invalid file name {:?}", job.file_name))
            })?;

        let (file_name, data) = match &self.compressor {
            Some(compressor) => (
                format!("{}.zst", base),
                compressor.compress(job.document.as_bytes())?,
            ),
            None => (base.to_string(), job.document.as_bytes().to_vec()),
        };

        let path = self.output_dir.join(&file_name);
        std::fs::write(&path, &data).map_err(|e| {
            ArchiveError::StorageFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        debug!("Wrote {} ({} bytes)", path.display(), data.len());

        self.index.lock().record(&ExportRecord {
            file_name,
            file_path: path.to_string_lossy().into_owned(),
            document_size: job.document.len() as u64,
            stored_size: data.len() as u64,
            compressed: self.compressor.is_some(),
            created_at: chrono::Utc::now().timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::compressor::CompressionLevel;
    use crate::recording::document::{ArchiveMetadata, ExportDocument};

    fn config(dir: &Path, compress: bool) -> SinkConfig {
        SinkConfig {
            output_dir: dir.to_path_buf(),
            compress,
            ..Default::default()
        }
    }

    fn document_text() -> String {
        ExportDocument {
            metadata: ArchiveMetadata::new("7001", "room-abc", 0),
            messages: Vec::new(),
        }
        .to_json()
        .unwrap()
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.submit("a.json", "{}".into()).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.drain()[0].file_name, "a.json");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_directory_sink_writes_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(config(dir.path(), false)).unwrap();

        sink.submit("archive-7001-1.json", document_text()).unwrap();
        sink.close();

        let written = std::fs::read_to_string(dir.path().join("archive-7001-1.json")).unwrap();
        assert_eq!(written, document_text());
        assert_eq!(sink.written(), 1);

        let exports = sink.list_exports().unwrap();
        assert_eq!(exports.len(), 1);
        assert!(!exports[0].compressed);
    }

    #[test]
    fn test_directory_sink_compresses() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(config(dir.path(), true)).unwrap();

        sink.submit("archive.json", document_text()).unwrap();
        sink.close();

        let path = dir.path().join("archive.json.zst");
        let doc = ExportDocument::load_from_file(&path).unwrap();
        assert_eq!(doc.metadata.room_num, "7001");
        assert_eq!(sink.index_stats().unwrap().total_exports, 1);
    }

    #[test]
    fn test_directory_sink_uses_configured_level() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(SinkConfig {
            compression_level: CompressionLevel::Fast,
            ..config(dir.path(), true)
        })
        .unwrap();

        sink.submit("fast.json", document_text()).unwrap();
        sink.close();

        let stored = std::fs::read(dir.path().join("fast.json.zst")).unwrap();
        let expected = Compressor::new(CompressionLevel::Fast)
            .compress(document_text().as_bytes())
            .unwrap();
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_directory_sink_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(config(dir.path(), false)).unwrap();

        sink.submit("../../escape.json", document_text()).unwrap();
        sink.close();

        assert!(dir.path().join("escape.json").exists());
    }

    #[test]
    fn test_submit_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(config(dir.path(), false)).unwrap();
        sink.close();

        let result = sink.submit("late.json", document_text());
        assert!(matches!(result, Err(ArchiveError::SinkFailed(_))));
    }
}
