// src/recording/inspector.rs
//! Per-method message statistics for live debugging
//!
//! Tracks how often each method is seen, keeps a few redacted samples, and
//! flags methods that the caller reports as unhandled.

use crate::observability::reporter::{ArchiveEvent, Reporter};
use crate::recording::redactor::Redactor;
use crate::utils::errors::{ArchiveError, Result};
use crate::utils::time::now_millis;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_MAX_SAMPLES: usize = 3;

/// One stored sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSample {
    pub timestamp: i64,
    pub data: Option<Value>,
    pub processed: bool,
}

/// Counters for one method
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodStat {
    #[serde(rename = "type")]
    pub method: String,
    pub count: u64,

    /// Occurrences the caller did not handle
    pub unprocessed: u64,

    pub last_seen: i64,
    pub samples: Vec<MessageSample>,
}

#[derive(Serialize)]
struct InspectorExport<'a> {
    timestamp: i64,
    stats: Vec<&'a MethodStat>,
}

/// Message statistics collector
pub struct MessageInspector {
    enabled: bool,
    max_samples: usize,
    redactor: Redactor,
    reporter: Arc<dyn Reporter>,

    /// First-seen order
    stats: Vec<MethodStat>,
    positions: HashMap<String, usize>,
}

impl MessageInspector {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            enabled: false,
            max_samples: DEFAULT_MAX_SAMPLES,
            redactor: Redactor::inspector(),
            reporter,
            stats: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count one message of type `method`
    ///
    /// `processed == false` reports [`ArchiveEvent::UnhandledMethod`].
    pub fn record(&mut self, method: &str, message: Option<&Value>, processed: bool) {
        if !self.enabled {
            return;
        }

        let now = now_millis();
        let index = match self.positions.get(method) {
            Some(&index) => index,
            None => {
                self.stats.push(MethodStat {
                    method: method.to_string(),
                    count: 0,
                    unprocessed: 0,
                    last_seen: now,
                    samples: Vec::new(),
                });
                self.positions.insert(method.to_string(), self.stats.len() - 1);
                self.stats.len() - 1
            }
        };

        let stat = &mut self.stats[index];
        stat.count += 1;
        stat.last_seen = now;
        if !processed {
            stat.unprocessed += 1;
        }

        if stat.samples.len() < self.max_samples {
            stat.samples.push(MessageSample {
                timestamp: now,
                data: self.redactor.redact(message),
                processed,
            });
        }

        if !processed {
            self.reporter.report(ArchiveEvent::UnhandledMethod {
                method: method.to_string(),
            });
        }
    }

    /// All methods, most frequent first; ties keep first-seen order
    pub fn stats(&self) -> Vec<&MethodStat> {
        let mut sorted: Vec<&MethodStat> = self.stats.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    pub fn stat(&self, method: &str) -> Option<&MethodStat> {
        self.positions.get(method).map(|&i| &self.stats[i])
    }

    /// Methods seen at least once without being handled
    pub fn unprocessed_types(&self) -> Vec<String> {
        self.stats()
            .into_iter()
            .filter(|s| s.unprocessed > 0)
            .map(|s| s.method.clone())
            .collect()
    }

    pub fn samples(&self, method: &str) -> Vec<Option<Value>> {
        self.stat(method)
            .map(|s| s.samples.iter().map(|sample| sample.data.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.stats.clear();
        self.positions.clear();
    }

    pub fn export_json(&self) -> Result<String> {
        let export = InspectorExport {
            timestamp: now_millis(),
            stats: self.stats(),
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| ArchiveError::ExportFailed(format!("JSON serialization error: {}", e)))
    }
}
