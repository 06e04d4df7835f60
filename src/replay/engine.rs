// src/replay/engine.rs
//! Timed replay of export documents
//!
//! Events are delivered strictly in document order. Before event `i > 0`
//! the engine waits `(ts[i] - ts[i-1]) / speed`; non-positive gaps
//! (duplicate or out-of-order timestamps) are delivered immediately.
//! Only relative gaps are honoured, not the original wall-clock times.

use crate::observability::reporter::{ArchiveEvent, Reporter, TracingReporter};
use crate::recording::document::{CapturedEvent, ExportDocument};
use crate::utils::errors::{ArchiveError, Result};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Progress is reported every this many events
const PROGRESS_EVERY: usize = 100;

/// Per-invocation replay settings
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Speed multiplier; 2.0 halves every gap. Must be finite and positive.
    pub speed: f64,

    /// Cancelling stops the replay at the next event boundary
    pub cancel: CancellationToken,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            cancel: CancellationToken::new(),
        }
    }
}

impl ReplayOptions {
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// How a replay ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Events in the document
    pub total: usize,

    /// Events handed to the callback
    pub delivered: usize,

    /// Events whose payload failed to decode
    pub skipped: usize,

    pub cancelled: bool,
}

/// Replays documents, reporting progress to a [`Reporter`]
#[derive(Clone)]
pub struct Replayer {
    reporter: Arc<dyn Reporter>,
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new(Arc::new(TracingReporter))
    }
}

impl Replayer {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }

    /// Deliver every event of `doc` to `on_event` with its original cadence
    ///
    /// Fails before delivering anything when `speed` is not a positive
    /// number or the document metadata is unusable. A single undecodable
    /// payload is reported and skipped.
    pub async fn replay<F>(
        &self,
        doc: &ExportDocument,
        mut on_event: F,
        options: ReplayOptions,
    ) -> Result<ReplaySummary>
    where
        F: FnMut(&CapturedEvent, Bytes),
    {
        if !(options.speed.is_finite() && options.speed > 0.0) {
            return Err(ArchiveError::PreconditionFailed(format!(
                "replay speed must be a positive number, got {}",
                options.speed
            )));
        }
        doc.validate()?;

        let total = doc.messages.len();
        self.reporter.report(ArchiveEvent::ReplayStarted {
            room_num: doc.metadata.room_num.clone(),
            message_count: total,
            start_time: doc.metadata.start_time,
            end_time: doc.metadata.end_time,
        });

        let mut summary = ReplaySummary {
            total,
            ..Default::default()
        };

        for (index, event) in doc.messages.iter().enumerate() {
            if options.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if index > 0 {
                let previous = doc.messages[index - 1].timestamp;
                if let Some(delay) = scaled_delay(previous, event.timestamp, options.speed) {
                    tokio::select! {
                        biased;
                        _ = options.cancel.cancelled() => {
                            summary.cancelled = true;
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }

            match event.raw_bytes() {
                Ok(bytes) => {
                    on_event(event, bytes);
                    summary.delivered += 1;
                }
                Err(e) => {
                    self.reporter.report(ArchiveEvent::ReplayEventSkipped {
                        index,
                        error: e.to_string(),
                    });
                    summary.skipped += 1;
                }
            }

            if (index + 1) % PROGRESS_EVERY == 0 {
                self.reporter.report(ArchiveEvent::ReplayProgress {
                    delivered: summary.delivered,
                    total,
                });
            }
        }

        self.reporter.report(ArchiveEvent::ReplayFinished {
            delivered: summary.delivered,
            skipped: summary.skipped,
            cancelled: summary.cancelled,
        });

        Ok(summary)
    }
}

/// Replay with the default reporter and no external cancellation
pub async fn replay<F>(doc: &ExportDocument, on_event: F, speed: f64) -> Result<ReplaySummary>
where
    F: FnMut(&CapturedEvent, Bytes),
{
    Replayer::default()
        .replay(doc, on_event, ReplayOptions::default().with_speed(speed))
        .await
}

/// Wait before an event stamped `current` following one stamped `previous`
///
/// `None` when there is nothing to wait for.
fn scaled_delay(previous: i64, current: i64, speed: f64) -> Option<Duration> {
    let gap_ms = current.saturating_sub(previous);
    if gap_ms <= 0 {
        return None;
    }

    let delay_secs = gap_ms as f64 / speed / 1000.0;
    Some(Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX))
}
