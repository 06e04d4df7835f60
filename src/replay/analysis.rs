// src/replay/analysis.rs
//! Offline summary of an export document

use crate::recording::document::ExportDocument;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Occurrences of one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodCount {
    pub method: String,
    pub count: usize,
}

/// Result of [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub room_num: String,
    pub total_messages: usize,

    /// Distinct methods
    pub message_types: usize,

    /// Most frequent first; ties keep first-seen order
    pub distribution: Vec<MethodCount>,

    /// `end_time - start_time` in milliseconds (saturating), 0 when the end is unknown
    pub time_span: i64,
}

impl AnalysisReport {
    /// Percentage of all messages with this method's count
    pub fn share(&self, entry: &MethodCount) -> f64 {
        if self.total_messages == 0 {
            0.0
        } else {
            entry.count as f64 / self.total_messages as f64 * 100.0
        }
    }
}

/// Count messages per method
pub fn analyze(doc: &ExportDocument) -> AnalysisReport {
    let mut distribution: Vec<MethodCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for message in &doc.messages {
        match positions.get(message.method.as_str()) {
            Some(&i) => distribution[i].count += 1,
            None => {
                positions.insert(&message.method, distribution.len());
                distribution.push(MethodCount {
                    method: message.method.clone(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    distribution.sort_by(|a, b| b.count.cmp(&a.count));

    let time_span = doc
        .metadata
        .end_time
        .map(|end| end.saturating_sub(doc.metadata.start_time))
        .unwrap_or(0);

    AnalysisReport {
        room_num: doc.metadata.room_num.clone(),
        total_messages: doc.messages.len(),
        message_types: distribution.len(),
        distribution,
        time_span,
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Archive analysis")?;
        writeln!(f, "================")?;
        writeln!(f, "Room:      {}", self.room_num)?;
        writeln!(f, "Messages:  {}", self.total_messages)?;
        if self.time_span > 0 {
            writeln!(f, "Time span: {} s", (self.time_span as f64 / 1000.0).round())?;
        } else {
            writeln!(f, "Time span: unknown")?;
        }
        writeln!(f)?;
        writeln!(f, "Distribution:")?;
        for (i, entry) in self.distribution.iter().enumerate() {
            writeln!(
                f,
                "{}. {}: {} ({:.2}%)",
                i + 1,
                entry.method,
                entry.count,
                self.share(entry)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::document::{ArchiveMetadata, CapturedEvent};

    fn document(methods: &[&str], end_time: Option<i64>) -> ExportDocument {
        let mut metadata = ArchiveMetadata::new("7001", "room-abc", 10_000);
        metadata.end_time = end_time;

        ExportDocument {
            metadata,
            messages: methods
                .iter()
                .enumerate()
                .map(|(i, method)| CapturedEvent {
                    timestamp: 10_000 + i as i64,
                    method: method.to_string(),
                    msg_id: i.to_string(),
                    display_id: None,
                    payload: String::new(),
                    decoded: None,
                })
                .collect(),
        }
    }

    fn pairs(report: &AnalysisReport) -> Vec<(&str, usize)> {
        report
            .distribution
            .iter()
            .map(|e| (e.method.as_str(), e.count))
            .collect()
    }

    #[test]
    fn test_distribution() {
        let report = analyze(&document(&["A", "A", "B", "A", "C"], Some(70_000)));

        assert_eq!(report.total_messages, 5);
        assert_eq!(report.message_types, 3);
        assert_eq!(pairs(&report), vec![("A", 3), ("B", 1), ("C", 1)]);
        assert_eq!(report.time_span, 60_000);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let report = analyze(&document(&["C", "B", "A", "B", "C", "A"], None));
        assert_eq!(pairs(&report), vec![("C", 2), ("B", 2), ("A", 2)]);
        assert_eq!(report.time_span, 0);
    }

    #[test]
    fn test_empty_document() {
        let report = analyze(&document(&[], None));
        assert_eq!(report.total_messages, 0);
        assert!(report.distribution.is_empty());
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let mut doc = document(&["A"], Some(i64::MAX));
        doc.metadata.start_time = i64::MIN;
        let doc = ExportDocument::from_json(&doc.to_json().unwrap()).unwrap();

        assert_eq!(analyze(&doc).time_span, i64::MAX);

        let mut doc = document(&["A"], Some(i64::MIN));
        doc.metadata.start_time = i64::MAX;
        assert_eq!(analyze(&doc).time_span, i64::MIN);
    }

    #[test]
    fn test_share_and_display() {
        let report = analyze(&document(&["A", "A", "B", "C"], Some(12_000)));
        assert_eq!(report.share(&report.distribution[0]), 50.0);

        let text = report.to_string();
        assert!(text.contains("Room:      7001"));
        assert!(text.contains("Time span: 2 s"));
        assert!(text.contains("1. A: 2 (50.00%)"));
        assert!(text.contains("3. C: 1 (25.00%)"));
    }
}
