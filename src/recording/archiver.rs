// src/recording/archiver.rs
//! Archiver: the single owner of an [`ArchiveStore`]
//!
//! Every path that touches the live buffer (capture, threshold export,
//! timer export, manual export, clear) runs under one per-instance lock,
//! so snapshot, serialize, hand-off, and reset form one atomic step
//! relative to capture.
//!
//! # Export pipeline
//!
//! ```text
//! capture() ──(len == max_messages)──┐
//! timer tick ──(non-empty)───────────┼──▶ snapshot ─▶ to_json ─▶ sink.submit ─▶ reset
//! export_to_sink() ──────────────────┘
//! ```
//!
//! Sink failures are reported and swallowed on the capture and timer
//! paths; the buffer is reset either way (at-most-once delivery).

use crate::observability::reporter::{ArchiveEvent, Reporter, TracingReporter};
use crate::recording::document::{ArchiveMetadata, ExportDocument};
use crate::recording::scheduler::AutoExportScheduler;
use crate::recording::sink::ExportSink;
use crate::recording::store::{ArchiveStore, CaptureOutcome};
use crate::utils::config::ArchiverConfig;
use crate::utils::errors::{ArchiveError, Result};
use crate::utils::time::now_millis;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

/// Point-in-time archiver statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub enabled: bool,

    /// Messages in the live buffer
    pub message_count: usize,

    /// Documents successfully handed to the sink
    pub total_exported: u64,

    pub start_time: i64,
    pub duration_ms: i64,

    /// Approximate serialized size of the live buffer
    pub estimated_size: usize,
}

/// What a completed export handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub file_name: String,
    pub message_count: usize,
    pub bytes: usize,
}

/// Builder for [`Archiver`]
pub struct ArchiverBuilder {
    room_num: String,
    room_id: String,
    config: ArchiverConfig,
    sink: Arc<dyn ExportSink>,
    reporter: Arc<dyn Reporter>,
    runtime: Option<Handle>,
}

impl ArchiverBuilder {
    pub fn config(mut self, config: ArchiverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Runtime for the auto-export timer; defaults to the current one, if any
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<Archiver> {
        self.config.validate()?;

        let inner = Arc::new(Inner {
            store: Mutex::new(ArchiveStore::new(self.room_num, self.room_id, &self.config)),
            config: self.config,
            sink: self.sink,
            reporter: self.reporter,
            scheduler: Mutex::new(AutoExportScheduler::new()),
            runtime: self.runtime,
            exported: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        });

        let archiver = Archiver { inner };
        if archiver.inner.config.enabled && archiver.inner.config.auto_export {
            Inner::start_auto_export(&archiver.inner)?;
        }
        Ok(archiver)
    }
}

struct Inner {
    store: Mutex<ArchiveStore>,
    config: ArchiverConfig,
    sink: Arc<dyn ExportSink>,
    reporter: Arc<dyn Reporter>,
    scheduler: Mutex<AutoExportScheduler>,
    runtime: Option<Handle>,
    exported: AtomicU64,
    sequence: AtomicU64,
}

impl Inner {
    fn start_auto_export(this: &Arc<Self>) -> Result<()> {
        let runtime = this.runtime.as_ref().ok_or_else(|| {
            ArchiveError::PreconditionFailed(
                "auto-export requires a Tokio runtime".to_string(),
            )
        })?;

        let weak: Weak<Self> = Arc::downgrade(this);
        this.scheduler
            .lock()
            .start(runtime, this.config.export_interval(), move || {
                match weak.upgrade() {
                    Some(inner) => {
                        inner.export_if_non_empty();
                        true
                    }
                    None => false,
                }
            });
        Ok(())
    }

    fn export_if_non_empty(&self) {
        let mut store = self.store.lock();
        if !store.is_empty() {
            let _ = self.run_export(&mut store, None);
        }
    }

    /// Snapshot, serialize, hand off, reset; caller holds the store lock
    fn run_export(&self, store: &mut ArchiveStore, file_name: Option<&str>) -> Result<ExportReceipt> {
        let doc = store.snapshot();
        let file_name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| self.default_file_name(&doc.metadata));
        let message_count = doc.messages.len();

        let result = doc.to_json().and_then(|text| {
            let bytes = text.len();
            self.sink.submit(&file_name, text).map(|()| bytes)
        });

        store.reset_after_export();

        match result {
            Ok(bytes) => {
                self.exported.fetch_add(1, Ordering::Relaxed);
                self.reporter.report(ArchiveEvent::Exported {
                    file_name: file_name.clone(),
                    message_count,
                    bytes,
                });
                Ok(ExportReceipt {
                    file_name,
                    message_count,
                    bytes,
                })
            }
            Err(e) => {
                self.reporter.report(ArchiveEvent::ExportFailed {
                    file_name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn default_file_name(&self, metadata: &ArchiveMetadata) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "archive-{}-{}-{:04}.json",
            metadata.room_num,
            metadata.end_time.unwrap_or_else(now_millis),
            sequence
        )
    }
}

/// Captures messages and exports them to a sink
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Archiver {
    inner: Arc<Inner>,
}

impl Archiver {
    pub fn builder(
        room_num: impl Into<String>,
        room_id: impl Into<String>,
        sink: Arc<dyn ExportSink>,
    ) -> ArchiverBuilder {
        ArchiverBuilder {
            room_num: room_num.into(),
            room_id: room_id.into(),
            config: ArchiverConfig::default(),
            sink,
            reporter: Arc::new(TracingReporter),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Start capturing; starts the timer when auto-export is configured
    ///
    /// The store lock is held across both steps, and [`disable`] takes it
    /// the same way, so the enabled flag and the timer always agree.
    ///
    /// [`disable`]: Archiver::disable
    pub fn enable(&self) -> Result<()> {
        let mut store = self.inner.store.lock();
        if self.inner.config.auto_export {
            Inner::start_auto_export(&self.inner)?;
        }

        store.set_enabled(true);
        self.inner.reporter.report(ArchiveEvent::Enabled {
            room_num: store.metadata().room_num.clone(),
        });
        Ok(())
    }

    /// Stop capturing and cancel the timer
    pub fn disable(&self) {
        let mut store = self.inner.store.lock();
        store.set_enabled(false);
        self.inner.scheduler.lock().stop();
        self.inner.reporter.report(ArchiveEvent::Disabled {
            room_num: store.metadata().room_num.clone(),
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.store.lock().is_enabled()
    }

    pub fn is_auto_exporting(&self) -> bool {
        self.inner.scheduler.lock().is_running()
    }

    /// Record one message; never fails
    ///
    /// Reaching `max_messages` exports and resets before returning.
    pub fn capture(
        &self,
        method: &str,
        id: &str,
        raw_bytes: &[u8],
        decoded: Option<&Value>,
        source_id: Option<&str>,
    ) -> CaptureOutcome {
        let mut store = self.inner.store.lock();
        let outcome = store.capture(method, id, raw_bytes, decoded, source_id);

        if outcome == CaptureOutcome::AtCapacity {
            self.inner.reporter.report(ArchiveEvent::ThresholdReached {
                max_messages: store.max_messages(),
            });
            let _ = self.inner.run_export(&mut store, None);
        }

        outcome
    }

    /// Snapshot of the live buffer; nothing is reset
    pub fn export(&self) -> ExportDocument {
        self.inner.store.lock().snapshot()
    }

    pub fn export_json(&self) -> Result<String> {
        self.export().to_json()
    }

    /// Run the full export pipeline now
    ///
    /// The buffer is reset even when the sink rejects the document.
    pub fn export_to_sink(&self, file_name: Option<&str>) -> Result<ExportReceipt> {
        let mut store = self.inner.store.lock();
        self.inner.run_export(&mut store, file_name)
    }

    /// Discard the live buffer without exporting it
    pub fn clear(&self) {
        let discarded = self.inner.store.lock().clear();
        self.inner.reporter.report(ArchiveEvent::Cleared { discarded });
    }

    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().is_empty()
    }

    pub fn metadata(&self) -> ArchiveMetadata {
        self.inner.store.lock().metadata().clone()
    }

    pub fn stats(&self) -> ArchiveStats {
        let store = self.inner.store.lock();
        let start_time = store.metadata().start_time;

        ArchiveStats {
            enabled: store.is_enabled(),
            message_count: store.len(),
            total_exported: self.inner.exported.load(Ordering::Relaxed),
            start_time,
            duration_ms: now_millis() - start_time,
            estimated_size: store.estimated_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::reporter::MemoryReporter;
    use crate::recording::sink::MemorySink;
    use serde_json::json;
    use std::time::Duration;

    struct FailingSink;

    impl ExportSink for FailingSink {
        fn submit(&self, _file_name: &str, _document: String) -> Result<()> {
            Err(ArchiveError::SinkFailed("disk full".into()))
        }
    }

    fn enabled_config(max_messages: usize) -> ArchiverConfig {
        ArchiverConfig {
            enabled: true,
            max_messages,
            ..Default::default()
        }
    }

    fn archiver(config: ArchiverConfig) -> (Archiver, Arc<MemorySink>, Arc<MemoryReporter>) {
        let sink = MemorySink::new();
        let reporter = MemoryReporter::new();
        let archiver = Archiver::builder("7001", "room-abc", sink.clone())
            .config(config)
            .reporter(reporter.clone())
            .build()
            .unwrap();
        (archiver, sink, reporter)
    }

    #[test]
    fn test_disabled_capture_is_noop() {
        let (archiver, sink, _) = archiver(ArchiverConfig::default());
        let outcome = archiver.capture("WebcastChatMessage", "1", b"abc", None, None);

        assert_eq!(outcome, CaptureOutcome::Ignored);
        assert_eq!(archiver.len(), 0);
        assert_eq!(archiver.metadata().message_count, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_threshold_export_bounds_buffer() {
        let (archiver, sink, reporter) = archiver(enabled_config(3));

        for i in 0..7 {
            archiver.capture("A", &i.to_string(), &[i as u8], None, None);
            assert!(archiver.len() < 3);
        }

        let documents = sink.documents();
        assert_eq!(documents.len(), 2);
        assert_eq!(archiver.len(), 1);

        let first = ExportDocument::from_json(&documents[0].document).unwrap();
        assert_eq!(first.messages.len(), 3);
        assert_eq!(first.metadata.message_count, 3);
        assert!(first.metadata.end_time.is_some());
        assert_eq!(first.messages[2].msg_id, "2");

        let second = ExportDocument::from_json(&documents[1].document).unwrap();
        assert_eq!(second.messages[0].msg_id, "3");

        assert_eq!(
            reporter.count(|e| matches!(e, ArchiveEvent::ThresholdReached { max_messages: 3 })),
            2
        );
        assert_eq!(archiver.stats().total_exported, 2);
    }

    #[test]
    fn test_default_file_names_are_unique() {
        let (archiver, sink, _) = archiver(enabled_config(1));
        archiver.capture("A", "1", b"", None, None);
        archiver.capture("A", "2", b"", None, None);

        let documents = sink.documents();
        assert!(documents[0].file_name.starts_with("archive-7001-"));
        assert!(documents[0].file_name.ends_with("-0000.json"));
        assert_ne!(documents[0].file_name, documents[1].file_name);
    }

    #[test]
    fn test_sink_failure_is_isolated() {
        let reporter = MemoryReporter::new();
        let archiver = Archiver::builder("7001", "room-abc", Arc::new(FailingSink))
            .config(enabled_config(2))
            .reporter(reporter.clone())
            .build()
            .unwrap();

        for i in 0..5 {
            archiver.capture("A", &i.to_string(), b"x", None, None);
        }

        assert_eq!(archiver.len(), 1);
        assert_eq!(
            reporter.count(|e| matches!(e, ArchiveEvent::ExportFailed { .. })),
            2
        );
        assert_eq!(archiver.stats().total_exported, 0);

        let result = archiver.export_to_sink(None);
        assert!(matches!(result, Err(ArchiveError::SinkFailed(_))));
        assert!(archiver.is_empty());
    }

    #[test]
    fn test_export_does_not_reset() {
        let (archiver, sink, _) = archiver(enabled_config(100));
        archiver.capture("A", "1", b"x", None, Some("user1"));

        let doc = archiver.export();
        assert_eq!(doc.messages.len(), 1);
        assert_eq!(archiver.len(), 1);
        assert_eq!(archiver.metadata().end_time, None);
        assert!(sink.is_empty());

        let text = archiver.export_json().unwrap();
        assert!(text.contains("\"displayId\": \"user1\""));
    }

    #[test]
    fn test_export_to_sink_with_name() {
        let (archiver, sink, _) = archiver(enabled_config(100));
        archiver.capture("A", "1", b"x", None, None);
        archiver.capture("B", "2", b"y", None, None);

        let receipt = archiver.export_to_sink(Some("manual.json")).unwrap();
        assert_eq!(receipt.file_name, "manual.json");
        assert_eq!(receipt.message_count, 2);
        assert!(archiver.is_empty());
        assert_eq!(archiver.metadata().message_count, 0);

        let documents = sink.documents();
        assert_eq!(documents[0].file_name, "manual.json");
        assert_eq!(receipt.bytes, documents[0].document.len());
    }

    #[test]
    fn test_decoded_copies_are_redacted() {
        let config = ArchiverConfig {
            include_decoded: true,
            ..enabled_config(100)
        };
        let (archiver, _, _) = archiver(config);
        archiver.capture("A", "1", b"x", Some(&json!({"content": "hi", "extra": 1})), None);

        assert_eq!(archiver.export().messages[0].decoded, Some(json!({"content": "hi"})));
    }

    #[test]
    fn test_clear_and_stats() {
        let (archiver, sink, reporter) = archiver(enabled_config(100));
        archiver.capture("A", "1", b"x", None, None);
        archiver.capture("A", "2", b"x", None, None);

        let stats = archiver.stats();
        assert!(stats.enabled);
        assert_eq!(stats.message_count, 2);
        assert!(stats.estimated_size > 0);

        archiver.clear();
        assert!(archiver.is_empty());
        assert!(sink.is_empty());
        assert!(reporter.events().contains(&ArchiveEvent::Cleared { discarded: 2 }));
        assert_eq!(archiver.stats().estimated_size, 0);
    }

    #[test]
    fn test_enable_disable() {
        let (archiver, _, reporter) = archiver(ArchiverConfig::default());
        archiver.enable().unwrap();
        assert!(archiver.is_enabled());
        assert_eq!(archiver.capture("A", "1", b"", None, None), CaptureOutcome::Stored);

        archiver.disable();
        assert!(!archiver.is_enabled());
        assert_eq!(archiver.capture("A", "2", b"", None, None), CaptureOutcome::Ignored);
        assert_eq!(archiver.len(), 1);

        let events = reporter.events();
        assert!(matches!(events[0], ArchiveEvent::Enabled { .. }));
        assert!(matches!(events[1], ArchiveEvent::Disabled { .. }));
    }

    #[test]
    fn test_auto_export_requires_runtime() {
        let config = ArchiverConfig {
            auto_export: true,
            ..Default::default()
        };
        let (archiver, _, _) = archiver(config.clone());
        assert!(matches!(archiver.enable(), Err(ArchiveError::PreconditionFailed(_))));
        assert!(!archiver.is_enabled());

        let result = Archiver::builder("7001", "room-abc", MemorySink::new())
            .config(ArchiverConfig {
                enabled: true,
                ..config
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = Archiver::builder("7001", "room-abc", MemorySink::new())
            .config(enabled_config(0))
            .build();
        assert!(matches!(result, Err(ArchiveError::ConfigError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_export_ticks() {
        let config = ArchiverConfig {
            enabled: true,
            auto_export: true,
            export_interval_ms: 1_000,
            ..Default::default()
        };
        let (archiver, sink, _) = archiver(config);
        assert!(archiver.is_auto_exporting());

        archiver.capture("A", "1", b"x", None, None);
        archiver.capture("A", "2", b"x", None, None);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(sink.len(), 1);
        assert!(archiver.is_empty());

        // Empty buffer: tick does nothing.
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(sink.len(), 1);

        archiver.capture("A", "3", b"x", None, None);
        archiver.disable();
        assert!(!archiver.is_auto_exporting());

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(sink.len(), 1);
        assert_eq!(archiver.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_twice_keeps_one_timer() {
        let config = ArchiverConfig {
            auto_export: true,
            export_interval_ms: 1_000,
            ..Default::default()
        };
        let (archiver, sink, _) = archiver(config);
        archiver.enable().unwrap();
        archiver.enable().unwrap();

        archiver.capture("A", "1", b"x", None, None);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        archiver.capture("A", "2", b"x", None, None);
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        let documents = sink.documents();
        assert_eq!(documents.len(), 2);
        for doc in documents {
            assert_eq!(ExportDocument::from_json(&doc.document).unwrap().messages.len(), 1);
        }
    }

    #[test]
    fn test_concurrent_toggle_keeps_timer_in_step() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let config = ArchiverConfig {
            auto_export: true,
            export_interval_ms: 60_000,
            ..Default::default()
        };
        let archiver = Archiver::builder("7001", "room-abc", MemorySink::new())
            .config(config)
            .reporter(Arc::new(crate::observability::reporter::NullReporter))
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let archiver = archiver.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        if (i + t) % 2 == 0 {
                            archiver.enable().unwrap();
                        } else {
                            archiver.disable();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(archiver.is_enabled(), archiver.is_auto_exporting());

        archiver.enable().unwrap();
        assert!(archiver.is_auto_exporting());
        archiver.disable();
        assert!(!archiver.is_auto_exporting());
    }

    #[test]
    fn test_concurrent_capture_loses_nothing() {
        let (archiver, sink, _) = archiver(enabled_config(50));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let archiver = archiver.clone();
                std::thread::spawn(move || {
                    for i in 0..125 {
                        archiver.capture("A", &format!("{}-{}", t, i), b"x", None, None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let documents = sink.documents();
        assert_eq!(documents.len(), 20);
        for doc in &documents {
            let doc = ExportDocument::from_json(&doc.document).unwrap();
            assert_eq!(doc.messages.len(), 50);
            assert_eq!(doc.metadata.message_count, 50);
        }
        assert!(archiver.is_empty());
    }
}
