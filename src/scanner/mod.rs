//! Synchronisation of the gallery tree into the `nodes` and `images` tables.
//!
//! Each pass discovers entities on disk, upserts them in one transaction,
//! then prunes rows that were not refreshed since the pass started.

pub mod discovery;
pub mod gallery_name;
pub mod hashing;
pub mod metadata;
pub mod slug;

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::db::{self, Database, EntityKind};
use crate::error::Result;
use crate::model::{GalleryNode, ImageRecord};

pub use discovery::{discover_directories, discover_images, Entry};
pub use hashing::Salts;

/// Counters for one synchronisation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub discovered: usize,
    pub written: usize,
    pub failed: Vec<String>,
    pub pruned: usize,
    pub elapsed: Duration,
}

pub fn build_node(rel_path: &str) -> GalleryNode {
    let name = discovery::name_of(rel_path);
    GalleryNode {
        path: rel_path.to_string(),
        depth: discovery::depth_of(rel_path),
        name: name.to_string(),
        url: slug::slugify(rel_path),
        hash: hashing::content_address(rel_path),
        meta: gallery_name::parse(name),
    }
}

pub fn build_image(rel_path: &str, salts: &Salts) -> ImageRecord {
    ImageRecord {
        path: rel_path.to_string(),
        depth: discovery::depth_of(rel_path),
        name: discovery::name_of(rel_path).to_string(),
        parent: discovery::parent_key(rel_path).to_string(),
        small: hashing::derivative_address(rel_path, &salts.small),
        medium: hashing::derivative_address(rel_path, &salts.medium),
        large: hashing::derivative_address(rel_path, &salts.large),
    }
}

/// Reconcile the `nodes` table with the directories below `gallery_root`.
pub fn sync_nodes(db: &mut Database, gallery_root: &Path) -> Result<SyncReport> {
    let nodes: Vec<GalleryNode> = discover_directories(gallery_root)
        .iter()
        .map(|entry| build_node(&entry.rel_path))
        .collect();

    sync(db, EntityKind::Nodes, nodes.len(), |db, now| {
        db.upsert_nodes(&nodes, now)
    })
}

/// Reconcile the `images` table with the photos below `gallery_root`.
///
/// Must run after [`sync_nodes`] has committed, since every image references
/// its enclosing node.
pub fn sync_images(
    db: &mut Database,
    gallery_root: &Path,
    extensions: &[String],
    salts: &Salts,
) -> Result<SyncReport> {
    let images: Vec<ImageRecord> = discover_images(gallery_root, extensions)
        .iter()
        .map(|entry| build_image(&entry.rel_path, salts))
        .collect();

    sync(db, EntityKind::Images, images.len(), |db, now| {
        db.upsert_images(&images, now)
    })
}

fn sync<F>(db: &mut Database, kind: EntityKind, discovered: usize, upsert: F) -> Result<SyncReport>
where
    F: FnOnce(&mut Database, &str) -> Result<db::BatchOutcome>,
{
    let start = Instant::now();
    let pass_started = db::now_timestamp();

    let outcome = upsert(db, &pass_started)?;
    if !outcome.failed.is_empty() {
        warn!(
            "{} {} row(s) failed to sync and are kept until the next run",
            outcome.failed.len(),
            kind.table()
        );
    }

    let pruned = db.prune(kind, &pass_started, &outcome.failed)?;

    let report = SyncReport {
        discovered,
        written: outcome.written,
        failed: outcome.failed,
        pruned,
        elapsed: start.elapsed(),
    };
    info!(
        "Synced {}: {} found, {} written, {} pruned in {}ms",
        kind.table(),
        report.discovered,
        report.written,
        report.pruned,
        report.elapsed.as_millis()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn extensions() -> Vec<String> {
        vec!["jpg".to_string(), "jpeg".to_string(), "jpe".to_string()]
    }

    fn salts() -> Salts {
        Salts {
            small: "SMALL".to_string(),
            medium: "MEDIUM".to_string(),
            large: "LARGE".to_string(),
        }
    }

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_build_node() {
        let node = build_node("2023/231231 Trip § Reunion § § Paris, France");
        assert_eq!(node.depth, 1);
        assert_eq!(node.name, "231231 Trip § Reunion § § Paris, France");
        assert_eq!(node.url, "2023-231231-trip");
        assert_eq!(node.hash.len(), 16);
        assert_eq!(node.meta.captured_at, "2023-12-31 00:00:00");
        assert_eq!(node.meta.title, "Trip");
        assert_eq!(node.meta.city, "Paris");
    }

    #[test]
    fn test_build_image() {
        let image = build_image("2023/trip/img.jpg", &salts());
        assert_eq!(image.parent, "2023/trip");
        assert_eq!(image.depth, 2);
        assert_eq!(image.name, "img.jpg");
        assert_eq!(
            image.small,
            hashing::derivative_address("2023/trip/img.jpg", "SMALL")
        );
        assert_ne!(image.small, image.medium);
        assert_ne!(image.medium, image.large);
    }

    #[test]
    fn test_second_sync_is_a_no_op() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        File::create(dir.path().join("a/one.jpg")).unwrap();
        File::create(dir.path().join("a/b/two.jpg")).unwrap();
        let mut db = test_db();

        sync_nodes(&mut db, dir.path()).unwrap();
        sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap();
        let created = db.timestamps(EntityKind::Images, "a/one.jpg").unwrap().unwrap().0;

        let nodes = sync_nodes(&mut db, dir.path()).unwrap();
        let images = sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap();

        assert_eq!(nodes.pruned, 0);
        assert_eq!(images.pruned, 0);
        assert_eq!(images.discovered, 2);
        assert_eq!(
            db.timestamps(EntityKind::Images, "a/one.jpg").unwrap().unwrap().0,
            created
        );
    }

    #[test]
    fn test_removed_entities_are_pruned() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("keep")).unwrap();
        fs::create_dir_all(dir.path().join("gone")).unwrap();
        File::create(dir.path().join("keep/a.jpg")).unwrap();
        File::create(dir.path().join("keep/b.jpg")).unwrap();
        File::create(dir.path().join("gone/c.jpg")).unwrap();
        let mut db = test_db();

        sync_nodes(&mut db, dir.path()).unwrap();
        sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap();

        fs::remove_dir_all(dir.path().join("gone")).unwrap();
        fs::remove_file(dir.path().join("keep/b.jpg")).unwrap();

        let nodes = sync_nodes(&mut db, dir.path()).unwrap();
        let images = sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap();

        assert_eq!(nodes.pruned, 1);
        assert_eq!(images.pruned, 2);
        assert_eq!(db.paths(EntityKind::Nodes).unwrap(), vec!["keep"]);
        assert_eq!(db.paths(EntityKind::Images).unwrap(), vec!["keep/a.jpg"]);
    }

    fn two_image_gallery() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("keep")).unwrap();
        File::create(dir.path().join("keep/a.jpg")).unwrap();
        File::create(dir.path().join("keep/b.jpg")).unwrap();
        let mut db = test_db();
        sync_nodes(&mut db, dir.path()).unwrap();
        sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap();
        (dir, db)
    }

    #[test]
    fn test_failed_row_survives_the_prune() {
        let (dir, mut db) = two_image_gallery();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_b BEFORE INSERT ON images WHEN NEW.path = 'keep/b.jpg'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let images = sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap();

        assert_eq!(images.written, 1);
        assert_eq!(images.failed, vec!["keep/b.jpg".to_string()]);
        assert_eq!(images.pruned, 0);
        assert_eq!(
            db.paths(EntityKind::Images).unwrap(),
            vec!["keep/a.jpg", "keep/b.jpg"]
        );
    }

    #[test]
    fn test_rolled_back_sync_skips_the_prune() {
        let (dir, mut db) = two_image_gallery();
        let updated = db.timestamps(EntityKind::Images, "keep/a.jpg").unwrap().unwrap().1;
        db.conn()
            .execute_batch(
                "CREATE TRIGGER rollback_b BEFORE INSERT ON images WHEN NEW.path = 'keep/b.jpg'
                 BEGIN SELECT RAISE(ROLLBACK, 'disk full'); END;",
            )
            .unwrap();

        let err = sync_images(&mut db, dir.path(), &extensions(), &salts()).unwrap_err();

        assert!(!err.is_fatal());
        assert_eq!(
            db.paths(EntityKind::Images).unwrap(),
            vec!["keep/a.jpg", "keep/b.jpg"]
        );
        // The refresh of a.jpg went down with the transaction.
        assert_eq!(
            db.timestamps(EntityKind::Images, "keep/a.jpg").unwrap().unwrap().1,
            updated
        );
    }
}
