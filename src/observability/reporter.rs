// src/observability/reporter.rs
//! Observability collaborator for the archiver and replay engine
//!
//! Core types never log directly; they hand an [`ArchiveEvent`] to an
//! injected [`Reporter`]. [`TracingReporter`] is the production default.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Something worth reporting from the capture, export, or replay paths
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveEvent {
    Enabled {
        room_num: String,
    },
    Disabled {
        room_num: String,
    },
    /// Live buffer reached `max_messages`; a synchronous export follows
    ThresholdReached {
        max_messages: usize,
    },
    Exported {
        file_name: String,
        message_count: usize,
        bytes: usize,
    },
    /// The sink rejected a document; the store was reset regardless
    ExportFailed {
        file_name: String,
        error: String,
    },
    Cleared {
        discarded: usize,
    },
    ReplayStarted {
        room_num: String,
        message_count: usize,
        start_time: i64,
        end_time: Option<i64>,
    },
    ReplayProgress {
        delivered: usize,
        total: usize,
    },
    /// A single event could not be decoded and was not delivered
    ReplayEventSkipped {
        index: usize,
        error: String,
    },
    ReplayFinished {
        delivered: usize,
        skipped: usize,
        cancelled: bool,
    },
    /// The inspector saw a method nobody handled
    UnhandledMethod {
        method: String,
    },
}

/// Sink for [`ArchiveEvent`]s
pub trait Reporter: Send + Sync {
    fn report(&self, event: ArchiveEvent);
}

/// Logs through `tracing` and bumps `metrics` counters
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: ArchiveEvent) {
        match event {
            ArchiveEvent::Enabled { room_num } => {
                info!(room = %room_num, "Message archiving enabled");
            }
            ArchiveEvent::Disabled { room_num } => {
                info!(room = %room_num, "Message archiving disabled");
            }
            ArchiveEvent::ThresholdReached { max_messages } => {
                warn!("Archive reached {} messages, exporting", max_messages);
                metrics::counter!("feed_archiver_threshold_exports_total").increment(1);
            }
            ArchiveEvent::Exported {
                file_name,
                message_count,
                bytes,
            } => {
                info!(
                    "Exported {} messages to {} ({} bytes)",
                    message_count, file_name, bytes
                );
                metrics::counter!("feed_archiver_exports_total").increment(1);
                metrics::counter!("feed_archiver_exported_messages_total")
                    .increment(message_count as u64);
            }
            ArchiveEvent::ExportFailed { file_name, error } => {
                warn!("Export of {} failed: {}", file_name, error);
                metrics::counter!("feed_archiver_export_failures_total").increment(1);
            }
            ArchiveEvent::Cleared { discarded } => {
                info!("Archive cleared ({} messages discarded)", discarded);
            }
            ArchiveEvent::ReplayStarted {
                room_num,
                message_count,
                start_time,
                end_time,
            } => {
                info!(
                    room = %room_num,
                    "Replaying {} messages ({} - {})",
                    message_count,
                    crate::utils::time::format_timestamp(start_time),
                    end_time
                        .map(crate::utils::time::format_timestamp)
                        .unwrap_or_else(|| "in progress".to_string())
                );
            }
            ArchiveEvent::ReplayProgress { delivered, total } => {
                debug!("Replay progress: {}/{}", delivered, total);
            }
            ArchiveEvent::ReplayEventSkipped { index, error } => {
                warn!("Skipping replay event {}: {}", index, error);
                metrics::counter!("feed_archiver_replay_skipped_total").increment(1);
            }
            ArchiveEvent::ReplayFinished {
                delivered,
                skipped,
                cancelled,
            } => {
                if cancelled {
                    info!("Replay cancelled after {} messages", delivered);
                } else {
                    info!("Replay finished: {} delivered, {} skipped", delivered, skipped);
                }
                metrics::counter!("feed_archiver_replayed_messages_total")
                    .increment(delivered as u64);
            }
            ArchiveEvent::UnhandledMethod { method } => {
                warn!("Unhandled message type: {}", method);
            }
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: ArchiveEvent) {}
}

/// Keeps every event in memory, in order
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ArchiveEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ArchiveEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&ArchiveEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: ArchiveEvent) {
        self.events.lock().push(event);
    }
}
