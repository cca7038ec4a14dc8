mod schema;
pub mod images;
pub mod nodes;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use images::{DerivativeCandidate, ImageExportRow};
pub use schema::SCHEMA;

use crate::error::{Error, Result};

/// Timestamp format stored in `created_at`/`updated_at`.
///
/// Lexicographic order equals chronological order, and microseconds keep two
/// runs within the same second apart.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// The two reconciled entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Nodes,
    Images,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Nodes => "nodes",
            EntityKind::Images => "images",
        }
    }

    pub(crate) fn upsert_stage(&self) -> &'static str {
        match self {
            EntityKind::Nodes => "upsert nodes",
            EntityKind::Images => "upsert images",
        }
    }

    pub(crate) fn prune_stage(&self) -> &'static str {
        match self {
            EntityKind::Nodes => "prune nodes",
            EntityKind::Images => "prune images",
        }
    }
}

/// Result of a batch write that tolerates per-row failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub written: usize,
    /// Keys whose row could not be written.
    pub failed: Vec<String>,
}

pub struct Database {
    path: PathBuf,
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| Error::OpenStore {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| Error::OpenStore {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, conn })
    }

    /// Create tables and indexes if they do not exist yet.
    pub fn initialize(&self) -> Result<()> {
        let result = self
            .conn
            .execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .and_then(|_| self.conn.execute_batch(SCHEMA));
        result.map_err(|source| Error::OpenStore {
            path: self.path.clone(),
            source,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete every row of `kind` not refreshed since `before`.
    ///
    /// Paths in `keep` survive even when stale: they were seen on disk this
    /// pass but their upsert failed.
    pub fn prune(&mut self, kind: EntityKind, before: &str, keep: &[String]) -> Result<usize> {
        let stage = kind.prune_stage();
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let table = kind.table();

        let tx = self.conn.transaction().map_err(Error::transaction(stage))?;
        let stale: Vec<String> = {
            let mut stmt = tx
                .prepare(&format!("SELECT path FROM {} WHERE updated_at < ?1", table))
                .map_err(Error::transaction(stage))?;
            let rows = stmt
                .query_map([before], |row| row.get::<_, String>(0))
                .map_err(Error::transaction(stage))?;
            rows.collect::<rusqlite::Result<_>>()
                .map_err(Error::transaction(stage))?
        };

        let mut deleted = 0;
        {
            let mut stmt = tx
                .prepare(&format!("DELETE FROM {} WHERE path = ?1", table))
                .map_err(Error::transaction(stage))?;
            for path in &stale {
                if keep.contains(path.as_str()) {
                    warn!("Keeping stale {} row {} after failed upsert", table, path);
                    continue;
                }
                deleted += stmt.execute([path]).map_err(Error::transaction(stage))?;
                debug!("Pruned {} row {}", table, path);
            }
        }
        tx.commit().map_err(Error::transaction(stage))?;

        Ok(deleted)
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", kind.table()), [], |row| {
                row.get(0)
            })
            .map_err(Error::transaction("count"))?;
        Ok(count as usize)
    }

    /// `(created_at, updated_at)` of one row.
    pub fn timestamps(&self, kind: EntityKind, path: &str) -> Result<Option<(String, String)>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT created_at, updated_at FROM {} WHERE path = ?1",
                    kind.table()
                ),
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(Error::transaction("timestamps"))
    }

    pub fn paths(&self, kind: EntityKind) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT path FROM {} ORDER BY path", kind.table()))
            .map_err(Error::transaction("paths"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(Error::transaction("paths"))?;
        rows.collect::<rusqlite::Result<_>>()
            .map_err(Error::transaction("paths"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GalleryMeta, GalleryNode};
    use chrono::TimeZone;

    fn node(path: &str) -> GalleryNode {
        GalleryNode {
            path: path.to_string(),
            depth: 0,
            name: path.to_string(),
            url: path.to_string(),
            hash: format!("{:016x}", path.len()),
            meta: GalleryMeta::default(),
        }
    }

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-02 03:04:05.000000");
    }

    #[test]
    fn test_initialize_is_repeatable() {
        let db = test_db();
        db.initialize().unwrap();
        assert_eq!(db.count(EntityKind::Nodes).unwrap(), 0);
        assert_eq!(db.count(EntityKind::Images).unwrap(), 0);
    }

    #[test]
    fn test_prune_removes_only_stale_rows() {
        let mut db = test_db();
        db.upsert_nodes(&[node("a"), node("b")], "2024-01-01 00:00:00.000000")
            .unwrap();
        db.upsert_nodes(&[node("a")], "2024-01-02 00:00:00.000000")
            .unwrap();

        let deleted = db
            .prune(EntityKind::Nodes, "2024-01-02 00:00:00.000000", &[])
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(db.paths(EntityKind::Nodes).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_prune_keeps_failed_paths() {
        let mut db = test_db();
        db.upsert_nodes(&[node("a"), node("b")], "2024-01-01 00:00:00.000000")
            .unwrap();

        let deleted = db
            .prune(
                EntityKind::Nodes,
                "2024-01-02 00:00:00.000000",
                &["b".to_string()],
            )
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(db.paths(EntityKind::Nodes).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::open(&dir.path().join("missing/db.sqlite3"))
            .and_then(|db| db.initialize())
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
