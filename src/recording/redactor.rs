// src/recording/redactor.rs
//! Allow-list reduction of decoded messages
//!
//! Decoded payloads can be large; only a fixed set of top-level fields is
//! worth keeping next to the raw frame.

use serde_json::{Map, Value};

/// Fields kept in archived `decoded` copies
pub const ARCHIVE_FIELDS: &[&str] = &[
    "common",
    "user",
    "content",
    "gift",
    "count",
    "total",
    "memberCount",
    "followCount",
    "action",
    "status",
    "fansLevel",
    "fansClubName",
    "title",
    "describe",
];

/// Fields kept in inspector samples (archive set plus effect metadata)
pub const INSPECTOR_FIELDS: &[&str] = &[
    "common",
    "user",
    "content",
    "gift",
    "count",
    "total",
    "memberCount",
    "followCount",
    "action",
    "status",
    "fansLevel",
    "fansClubName",
    "title",
    "describe",
    "bannerId",
    "effectId",
    "effectType",
];

/// Reduces objects to a fixed allow-list of keys
#[derive(Debug, Clone, Copy)]
pub struct Redactor {
    fields: &'static [&'static str],
}

impl Redactor {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    pub const fn archive() -> Self {
        Self::new(ARCHIVE_FIELDS)
    }

    pub const fn inspector() -> Self {
        Self::new(INSPECTOR_FIELDS)
    }

    /// Keep only allow-listed keys that are present in `obj`
    ///
    /// `None` and JSON `null` yield `None`. Keys holding `null` are treated
    /// as present. Non-object values have no keys and reduce to `{}`.
    /// Output key order depends only on which keys survive, so equal input
    /// shapes serialize equally.
    pub fn redact(&self, obj: Option<&Value>) -> Option<Value> {
        let obj = match obj {
            None | Some(Value::Null) => return None,
            Some(obj) => obj,
        };

        let mut reduced = Map::new();
        if let Value::Object(map) = obj {
            for field in self.fields {
                if let Some(value) = map.get(*field) {
                    reduced.insert((*field).to_string(), value.clone());
                }
            }
        }

        Some(Value::Object(reduced))
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::archive()
    }
}

/// [`Redactor::redact`] with the archive allow-list
pub fn redact(obj: Option<&Value>) -> Option<Value> {
    Redactor::archive().redact(obj)
}
