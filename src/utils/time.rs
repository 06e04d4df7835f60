// src/utils/time.rs
//! Wall-clock helpers

use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a millisecond epoch timestamp as RFC 3339
pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .to_rfc3339()
}
