// src/recording/storage.rs
//! SQLite index of written export files
//!
//! The directory sink records one row per document it writes so that
//! exports can be listed without scanning the output directory.

use crate::utils::errors::{ArchiveError, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// Export index backed by SQLite
pub struct ExportIndex {
    db: Connection,
}

impl ExportIndex {
    /// Open (or create) the index database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Connection::open(path.as_ref()).map_err(|e| {
            ArchiveError::StorageFailed(format!("Failed to open database: {}", e))
        })?;

        let index = Self { db };
        index.init_schema()?;
        Ok(index)
    }

    /// In-memory index, mostly for tests
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().map_err(|e| {
            ArchiveError::StorageFailed(format!("Failed to open database: {}", e))
        })?;

        let index = Self { db };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> Result<()> {
        self.db
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS exports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_name TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    document_size INTEGER NOT NULL,
                    stored_size INTEGER NOT NULL,
                    compressed INTEGER NOT NULL,
                    created_at INTEGER NOT NULL
                )
                "#,
                [],
            )
            .map_err(|e| ArchiveError::StorageFailed(format!("Schema creation failed: {}", e)))?;

        self.db
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_exports_file_name ON exports(file_name)",
                [],
            )
            .map_err(|e| ArchiveError::StorageFailed(format!("Index creation failed: {}", e)))?;

        Ok(())
    }

    /// Record one written export
    pub fn record(&self, record: &ExportRecord) -> Result<()> {
        self.db
            .execute(
                r#"
                INSERT INTO exports (file_name, file_path, document_size, stored_size, compressed, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    record.file_name,
                    record.file_path,
                    record.document_size as i64,
                    record.stored_size as i64,
                    record.compressed,
                    record.created_at,
                ],
            )
            .map_err(|e| {
                ArchiveError::StorageFailed(format!("Failed to record export metadata: {}", e))
            })?;

        debug!("Indexed export {}", record.file_name);
        Ok(())
    }

    /// All exports, oldest first
    pub fn list(&self) -> Result<Vec<ExportRecord>> {
        let mut stmt = self
            .db
            .prepare(
                "SELECT file_name, file_path, document_size, stored_size, compressed, created_at \
                 FROM exports ORDER BY id",
            )
            .map_err(|e| ArchiveError::StorageFailed(format!("Query preparation failed: {}", e)))?;

        let records = stmt
            .query_map([], |row| {
                Ok(ExportRecord {
                    file_name: row.get(0)?,
                    file_path: row.get(1)?,
                    document_size: row.get::<_, i64>(2)? as u64,
                    stored_size: row.get::<_, i64>(3)? as u64,
                    compressed: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| ArchiveError::StorageFailed(format!("Query execution failed: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ArchiveError::StorageFailed(format!("Result collection failed: {}", e)))?;

        Ok(records)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let (total_exports, total_bytes): (i64, i64) = self
            .db
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(stored_size), 0) FROM exports",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| ArchiveError::StorageFailed(format!("Stats query failed: {}", e)))?;

        Ok(IndexStats {
            total_exports: total_exports as u64,
            total_stored_bytes: total_bytes as u64,
        })
    }
}

/// One row of the export index
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub file_name: String,
    pub file_path: String,

    /// Uncompressed JSON length
    pub document_size: u64,

    /// Bytes on disk
    pub stored_size: u64,

    pub compressed: bool,

    /// Unix seconds
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub total_exports: u64,
    pub total_stored_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, stored: u64) -> ExportRecord {
        ExportRecord {
            file_name: name.to_string(),
            file_path: format!("/tmp/{}", name),
            document_size: stored * 4,
            stored_size: stored,
            compressed: true,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_record_and_list() {
        let index = ExportIndex::in_memory().unwrap();
        index.record(&record("a.json.zst", 10)).unwrap();
        index.record(&record("b.json.zst", 20)).unwrap();

        let records = index.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record("a.json.zst", 10));
        assert_eq!(records[1].file_name, "b.json.zst");
    }

    #[test]
    fn test_stats() {
        let index = ExportIndex::in_memory().unwrap();
        assert_eq!(index.stats().unwrap().total_exports, 0);

        index.record(&record("a.json", 10)).unwrap();
        index.record(&record("b.json", 32)).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_exports, 2);
        assert_eq!(stats.total_stored_bytes, 42);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports.db");

        ExportIndex::open(&path).unwrap().record(&record("a.json", 1)).unwrap();
        assert_eq!(ExportIndex::open(&path).unwrap().list().unwrap().len(), 1);
    }
}
