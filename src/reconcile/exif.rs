use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{merge, WorkerBuffer};
use crate::db::Database;
use crate::error::Result;
use crate::parallel::{self, Progress};
use crate::scanner::metadata::extract_exif;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifReport {
    pub pending: usize,
    pub extracted: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Extract EXIF for every image whose flag is still unset.
///
/// Failed extractions are logged and left unflagged so the next run retries
/// them.
pub fn reconcile_exif(db: &mut Database, gallery_root: &Path, workers: usize) -> Result<ExifReport> {
    let start = Instant::now();
    let pending = db.pending_exif()?;
    let progress = Progress::new("EXIF", pending.len());

    let buffers = parallel::run(pending.len(), workers, |range| {
        let mut buffer = WorkerBuffer::default();
        for path in &pending[range.lower..range.upper] {
            match extract_exif(&gallery_root.join(path)) {
                Ok(data) => buffer.results.push((path.clone(), data)),
                Err(e) => {
                    warn!("EXIF extraction failed: {}", e);
                    buffer.failed += 1;
                }
            }
            progress.tick();
        }
        buffer
    })?;

    let (results, failed) = merge(buffers);
    let extracted = db.apply_exif(&results)?;

    let report = ExifReport {
        pending: pending.len(),
        extracted,
        failed,
        elapsed: start.elapsed(),
    };
    info!(
        "EXIF: {} pending, {} extracted, {} failed in {}ms",
        report.pending,
        report.extracted,
        report.failed,
        report.elapsed.as_millis()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{self, Salts};
    use std::fs;
    use tempfile::tempdir;

    fn salts() -> Salts {
        Salts {
            small: "S".to_string(),
            medium: "M".to_string(),
            large: "L".to_string(),
        }
    }

    #[test]
    fn test_extraction_runs_once() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("album")).unwrap();
        image::RgbImage::new(8, 8)
            .save(dir.path().join("album/a.jpg"))
            .unwrap();
        image::RgbImage::new(8, 8)
            .save(dir.path().join("album/b.jpg"))
            .unwrap();
        // Not a JPEG container at all.
        fs::write(dir.path().join("album/c.jpg"), b"garbage").unwrap();

        let mut db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let extensions = vec!["jpg".to_string()];
        scanner::sync_nodes(&mut db, dir.path()).unwrap();
        scanner::sync_images(&mut db, dir.path(), &extensions, &salts()).unwrap();

        let first = reconcile_exif(&mut db, dir.path(), 2).unwrap();
        assert_eq!(first.pending, 3);
        assert_eq!(first.extracted, 2);
        assert_eq!(first.failed, 1);
        assert!(db.exif_extracted("album/a.jpg").unwrap());
        assert!(!db.exif_extracted("album/c.jpg").unwrap());

        // Only the failed file is retried.
        let second = reconcile_exif(&mut db, dir.path(), 2).unwrap();
        assert_eq!(second.pending, 1);
        assert_eq!(second.extracted, 0);
    }
}
