// src/recording/store.rs
//! Bounded in-memory archive of captured messages
//!
//! The store is a plain single-owner state machine. It never talks to a
//! sink; when the live buffer reaches `max_messages` it says so through
//! [`CaptureOutcome::AtCapacity`] and the owning [`Archiver`] runs the export
//! pipeline before the next capture can start.
//!
//! [`Archiver`]: crate::recording::archiver::Archiver

use crate::recording::codec;
use crate::recording::document::{ArchiveMetadata, CapturedEvent, ExportDocument};
use crate::recording::redactor::Redactor;
use crate::utils::config::ArchiverConfig;
use crate::utils::time::now_millis;
use serde_json::Value;

/// Messages sampled when estimating the serialized size
const SIZE_SAMPLE: usize = 10;

/// Result of a single [`ArchiveStore::capture`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Capture is disabled; nothing changed
    Ignored,

    /// Appended, still below capacity
    Stored,

    /// Appended and the buffer is now full; export before capturing again
    AtCapacity,
}

/// Live capture buffer plus running metadata
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    enabled: bool,
    include_decoded: bool,
    max_messages: usize,
    redactor: Redactor,
    events: Vec<CapturedEvent>,
    metadata: ArchiveMetadata,
    last_timestamp: i64,
}

impl ArchiveStore {
    pub fn new(room_num: impl Into<String>, room_id: impl Into<String>, config: &ArchiverConfig) -> Self {
        Self {
            enabled: config.enabled,
            include_decoded: config.include_decoded,
            max_messages: config.max_messages.max(1),
            redactor: Redactor::archive(),
            events: Vec::new(),
            metadata: ArchiveMetadata::new(room_num, room_id, now_millis()),
            last_timestamp: i64::MIN,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Record one message
    ///
    /// Empty `source_id` strings are treated as absent. Timestamps never go
    /// backwards within one store, even if the wall clock does.
    pub fn capture(
        &mut self,
        method: &str,
        id: &str,
        raw_bytes: &[u8],
        decoded: Option<&Value>,
        source_id: Option<&str>,
    ) -> CaptureOutcome {
        if !self.enabled {
            return CaptureOutcome::Ignored;
        }

        let timestamp = now_millis().max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let decoded = if self.include_decoded {
            self.redactor.redact(decoded)
        } else {
            None
        };

        self.events.push(CapturedEvent {
            timestamp,
            method: method.to_string(),
            msg_id: id.to_string(),
            display_id: source_id.filter(|s| !s.is_empty()).map(str::to_string),
            payload: codec::encode(raw_bytes),
            decoded,
        });
        self.metadata.message_count += 1;

        if self.events.len() >= self.max_messages {
            CaptureOutcome::AtCapacity
        } else {
            CaptureOutcome::Stored
        }
    }

    /// Deep copy of the current contents with `end_time` stamped
    ///
    /// Live state is untouched.
    pub fn snapshot(&self) -> ExportDocument {
        let mut metadata = self.metadata.clone();
        metadata.end_time = Some(now_millis());

        ExportDocument {
            metadata,
            messages: self.events.clone(),
        }
    }

    /// Start a fresh capture window after a successful hand-off
    pub fn reset_after_export(&mut self) {
        self.events.clear();
        self.metadata.message_count = 0;
        self.metadata.start_time = now_millis();
        self.metadata.end_time = None;
    }

    /// Discard the live buffer without exporting it
    ///
    /// Returns the number of discarded messages.
    pub fn clear(&mut self) -> usize {
        let discarded = self.events.len();
        self.reset_after_export();
        discarded
    }

    /// Snapshot and reset in one step
    pub fn take_export(&mut self) -> ExportDocument {
        let doc = self.snapshot();
        self.reset_after_export();
        doc
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[CapturedEvent] {
        &self.events
    }

    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// Approximate serialized size of the live buffer in bytes
    pub fn estimated_size(&self) -> usize {
        if self.events.is_empty() {
            return 0;
        }

        let sample = &self.events[..self.events.len().min(SIZE_SAMPLE)];
        let sampled: usize = sample
            .iter()
            .map(|e| serde_json::to_string(e).map(|s| s.len()).unwrap_or(0))
            .sum();

        let average = sampled as f64 / sample.len() as f64;
        (average * self.events.len() as f64).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(max_messages: usize, include_decoded: bool) -> ArchiveStore {
        let config = ArchiverConfig {
            enabled: true,
            max_messages,
            include_decoded,
            ..Default::default()
        };
        ArchiveStore::new("7001", "room-abc", &config)
    }

    #[test]
    fn test_disabled_capture_is_noop() {
        let mut store = ArchiveStore::new("7001", "room-abc", &ArchiverConfig::default());
        let outcome = store.capture("WebcastChatMessage", "1", b"abc", None, None);

        assert_eq!(outcome, CaptureOutcome::Ignored);
        assert_eq!(store.len(), 0);
        assert_eq!(store.metadata().message_count, 0);
    }

    #[test]
    fn test_capture_appends_in_order() {
        let mut store = store_with(100, false);
        store.capture("A", "1", &[1, 2, 3], None, Some("user1"));
        store.capture("B", "2", &[], None, Some(""));

        let events = store.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].method, "A");
        assert_eq!(events[0].display_id.as_deref(), Some("user1"));
        assert_eq!(events[0].raw_bytes().unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(events[1].display_id, None);
        assert!(events[1].timestamp >= events[0].timestamp);
        assert_eq!(store.metadata().message_count, 2);
    }

    #[test]
    fn test_decoded_retention() {
        let decoded = json!({"content": "hi", "huge": "x".repeat(1000)});

        let mut store = store_with(100, false);
        store.capture("A", "1", b"x", Some(&decoded), None);
        assert_eq!(store.events()[0].decoded, None);

        let mut store = store_with(100, true);
        store.capture("A", "1", b"x", Some(&decoded), None);
        store.capture("A", "2", b"x", None, None);
        assert_eq!(store.events()[0].decoded, Some(json!({"content": "hi"})));
        assert_eq!(store.events()[1].decoded, None);
    }

    #[test]
    fn test_capacity_outcome() {
        let mut store = store_with(3, false);
        assert_eq!(store.capture("A", "1", b"", None, None), CaptureOutcome::Stored);
        assert_eq!(store.capture("A", "2", b"", None, None), CaptureOutcome::Stored);
        assert_eq!(store.capture("A", "3", b"", None, None), CaptureOutcome::AtCapacity);
    }

    #[test]
    fn test_snapshot_isolated_from_reset() {
        let mut store = store_with(100, true);
        store.capture("A", "1", b"one", Some(&json!({"title": "t"})), None);
        store.capture("B", "2", b"two", None, None);

        let snapshot = store.snapshot();
        assert_eq!(store.metadata().end_time, None);
        assert!(snapshot.metadata.end_time.is_some());

        store.reset_after_export();
        assert_eq!(store.len(), 0);
        assert_eq!(store.metadata().message_count, 0);
        assert_eq!(store.metadata().end_time, None);

        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.metadata.message_count, 2);
        assert_eq!(snapshot.messages[0].decoded, Some(json!({"title": "t"})));
    }

    #[test]
    fn test_take_export_resets() {
        let mut store = store_with(100, false);
        store.capture("A", "1", b"", None, None);
        let before = store.metadata().start_time;

        let doc = store.take_export();
        assert_eq!(doc.messages.len(), 1);
        assert!(store.is_empty());
        assert!(store.metadata().start_time >= before);
    }

    #[test]
    fn test_clear_reports_discarded() {
        let mut store = store_with(100, false);
        store.capture("A", "1", b"", None, None);
        store.capture("A", "2", b"", None, None);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.metadata().message_count, 0);
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn test_estimated_size() {
        let mut store = store_with(100, false);
        assert_eq!(store.estimated_size(), 0);

        store.capture("A", "1", b"abc", None, None);
        let single = serde_json::to_string(&store.events()[0]).unwrap().len();
        assert_eq!(store.estimated_size(), single);
    }
}
