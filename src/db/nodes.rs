use rusqlite::params;
use tracing::warn;

use super::{BatchOutcome, Database, EntityKind};
use crate::error::{Error, Result};
use crate::model::{GalleryMeta, GalleryNode};

impl Database {
    /// Insert new nodes and refresh `updated_at` on existing ones, in one
    /// transaction.
    ///
    /// A row that fails to write is logged and reported in
    /// [`BatchOutcome::failed`]; the rest of the batch still commits. A
    /// failure that makes SQLite abandon the transaction aborts the whole
    /// batch with nothing written.
    pub fn upsert_nodes(&mut self, nodes: &[GalleryNode], now: &str) -> Result<BatchOutcome> {
        let stage = EntityKind::Nodes.upsert_stage();
        let mut outcome = BatchOutcome::default();

        let tx = self.conn.transaction().map_err(Error::transaction(stage))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    r#"
                    INSERT INTO nodes (
                        depth, path, name, url, hash,
                        captured_at, title, event, location, city, country,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                    ON CONFLICT(path) DO UPDATE SET updated_at = excluded.updated_at
                    "#,
                )
                .map_err(Error::transaction(stage))?;

            for node in nodes {
                let result = stmt.execute(params![
                    node.depth,
                    node.path,
                    node.name,
                    node.url,
                    node.hash,
                    node.meta.captured_at,
                    node.meta.title,
                    node.meta.event,
                    node.meta.location,
                    node.meta.city,
                    node.meta.country,
                    now,
                ]);
                match result {
                    Ok(_) => outcome.written += 1,
                    // SQLite rolled the whole transaction back; later rows
                    // would land in autocommit mode.
                    Err(source) if tx.is_autocommit() => {
                        return Err(Error::Transaction { stage, source });
                    }
                    Err(e) => {
                        warn!("Failed to sync node {}: {}", node.path, e);
                        outcome.failed.push(node.path.clone());
                    }
                }
            }
        }
        tx.commit().map_err(Error::transaction(stage))?;

        Ok(outcome)
    }

    /// All nodes in export order.
    pub fn export_nodes(&self) -> Result<Vec<GalleryNode>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT hash, path, depth, name, url,
                       captured_at, title, event, location, city, country
                FROM nodes
                ORDER BY depth, path, captured_at, title
                "#,
            )
            .map_err(Error::transaction("export nodes"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(GalleryNode {
                    hash: row.get(0)?,
                    path: row.get(1)?,
                    depth: row.get(2)?,
                    name: row.get(3)?,
                    url: row.get(4)?,
                    meta: GalleryMeta {
                        captured_at: row.get(5)?,
                        title: row.get(6)?,
                        event: row.get(7)?,
                        location: row.get(8)?,
                        city: row.get(9)?,
                        country: row.get(10)?,
                    },
                })
            })
            .map_err(Error::transaction("export nodes"))?;

        rows.collect::<rusqlite::Result<_>>()
            .map_err(Error::transaction("export nodes"))
    }
}
