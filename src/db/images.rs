use rusqlite::{params, Row};
use std::collections::BTreeMap;
use tracing::warn;

use super::{BatchOutcome, Database, EntityKind};
use crate::error::{Error, Result};
use crate::model::{Dimensions, ExifData, ImageDimensions, ImageRecord};

/// An image as seen by the derivative pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeCandidate {
    pub path: String,
    /// Content address of the enclosing node; names the cache subdirectory.
    pub node_hash: String,
    pub small: String,
    pub medium: String,
    pub large: String,
    pub dimensions: ImageDimensions,
}

/// One image joined to its node, for the CSV and HTML exports.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageExportRow {
    pub node_hash: String,
    pub record: ImageRecord,
    pub dimensions: ImageDimensions,
    pub exif: ExifData,
}

const DIMENSION_COLUMNS: &str = "width, height, \
     small_width, small_height, medium_width, medium_height, large_width, large_height";

fn dimensions_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ImageDimensions> {
    let dims = |i: usize| -> rusqlite::Result<Dimensions> {
        Ok(Dimensions::new(row.get(offset + i)?, row.get(offset + i + 1)?))
    };
    Ok(ImageDimensions {
        source: dims(0)?,
        small: dims(2)?,
        medium: dims(4)?,
        large: dims(6)?,
    })
}

impl Database {
    /// Insert new images and refresh `updated_at` on existing ones, in one
    /// transaction. EXIF and dimensions of existing rows are left untouched.
    pub fn upsert_images(&mut self, images: &[ImageRecord], now: &str) -> Result<BatchOutcome> {
        let stage = EntityKind::Images.upsert_stage();
        let mut outcome = BatchOutcome::default();

        let tx = self.conn.transaction().map_err(Error::transaction(stage))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    r#"
                    INSERT INTO images (
                        depth, path, name, parent, small, medium, large,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                    ON CONFLICT(path) DO UPDATE SET updated_at = excluded.updated_at
                    "#,
                )
                .map_err(Error::transaction(stage))?;

            for image in images {
                let result = stmt.execute(params![
                    image.depth,
                    image.path,
                    image.name,
                    image.parent,
                    image.small,
                    image.medium,
                    image.large,
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
                        warn!("Failed to sync image {}: {}", image.path, e);
                        outcome.failed.push(image.path.clone());
                    }
                }
            }
        }
        tx.commit().map_err(Error::transaction(stage))?;

        Ok(outcome)
    }

    /// Paths of images whose EXIF has not been extracted yet.
    pub fn pending_exif(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM images WHERE exif = 0 ORDER BY path")
            .map_err(Error::transaction("pending exif"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(Error::transaction("pending exif"))?;
        rows.collect::<rusqlite::Result<_>>()
            .map_err(Error::transaction("pending exif"))
    }

    /// Store extracted EXIF and set the extracted flag, in one transaction.
    pub fn apply_exif(&mut self, results: &BTreeMap<String, ExifData>) -> Result<usize> {
        let stage = "apply exif";
        let mut updated = 0;

        let tx = self.conn.transaction().map_err(Error::transaction(stage))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    r#"
                    UPDATE images SET
                        exif = 1,
                        captured_at = ?1, fstop = ?2, exposure_time = ?3, iso_speed = ?4,
                        exposure_bias = ?5, flash = ?6, metering_mode = ?7,
                        focal_length = ?8, focal_length_35mm = ?9,
                        camera_make = ?10, camera_model = ?11, lens_make = ?12, lens_model = ?13,
                        software = ?14, description = ?15, copyright = ?16,
                        gps = ?17, gps_latitude = ?18, gps_longitude = ?19, gps_altitude = ?20
                    WHERE path = ?21
                    "#,
                )
                .map_err(Error::transaction(stage))?;

            for (path, exif) in results {
                updated += stmt
                    .execute(params![
                        exif.captured_at,
                        exif.fstop,
                        exif.exposure_time,
                        exif.iso_speed,
                        exif.exposure_bias,
                        exif.flash,
                        exif.metering_mode,
                        exif.focal_length,
                        exif.focal_length_35mm,
                        exif.camera_make,
                        exif.camera_model,
                        exif.lens_make,
                        exif.lens_model,
                        exif.software,
                        exif.description,
                        exif.copyright,
                        exif.gps,
                        exif.gps_latitude,
                        exif.gps_longitude,
                        exif.gps_altitude,
                        path,
                    ])
                    .map_err(Error::transaction(stage))?;
            }
        }
        tx.commit().map_err(Error::transaction(stage))?;

        Ok(updated)
    }

    /// Every image with its node hash and recorded dimensions.
    pub fn derivative_candidates(&self) -> Result<Vec<DerivativeCandidate>> {
        let stage = "derivative candidates";
        let mut stmt = self
            .conn
            .prepare(&format!(
                r#"
                SELECT images.path, nodes.hash, images.small, images.medium, images.large,
                       {}
                FROM images
                JOIN nodes ON nodes.path = images.parent
                ORDER BY images.path
                "#,
                qualified_dimensions()
            ))
            .map_err(Error::transaction(stage))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(DerivativeCandidate {
                    path: row.get(0)?,
                    node_hash: row.get(1)?,
                    small: row.get(2)?,
                    medium: row.get(3)?,
                    large: row.get(4)?,
                    dimensions: dimensions_from_row(row, 5)?,
                })
            })
            .map_err(Error::transaction(stage))?;

        rows.collect::<rusqlite::Result<_>>()
            .map_err(Error::transaction(stage))
    }

    /// Write back source and per-tier dimensions, in one transaction.
    pub fn apply_dimensions(&mut self, updates: &BTreeMap<String, ImageDimensions>) -> Result<usize> {
        let stage = "apply dimensions";
        let mut updated = 0;

        let tx = self.conn.transaction().map_err(Error::transaction(stage))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    r#"
                    UPDATE images SET
                        width = ?1, height = ?2,
                        small_width = ?3, small_height = ?4,
                        medium_width = ?5, medium_height = ?6,
                        large_width = ?7, large_height = ?8
                    WHERE path = ?9
                    "#,
                )
                .map_err(Error::transaction(stage))?;

            for (path, dims) in updates {
                updated += stmt
                    .execute(params![
                        dims.source.width,
                        dims.source.height,
                        dims.small.width,
                        dims.small.height,
                        dims.medium.width,
                        dims.medium.height,
                        dims.large.width,
                        dims.large.height,
                        path,
                    ])
                    .map_err(Error::transaction(stage))?;
            }
        }
        tx.commit().map_err(Error::transaction(stage))?;

        Ok(updated)
    }

    /// Images joined to their node, in export order.
    pub fn export_images(&self) -> Result<Vec<ImageExportRow>> {
        let stage = "export images";
        let mut stmt = self
            .conn
            .prepare(&format!(
                r#"
                SELECT nodes.hash,
                       images.path, images.depth, images.name, images.parent,
                       images.small, images.medium, images.large,
                       {},
                       images.captured_at, images.fstop, images.exposure_time, images.iso_speed,
                       images.exposure_bias, images.flash, images.metering_mode,
                       images.focal_length, images.focal_length_35mm,
                       images.camera_make, images.camera_model, images.lens_make, images.lens_model,
                       images.software, images.description, images.copyright,
                       images.gps, images.gps_latitude, images.gps_longitude, images.gps_altitude
                FROM images
                JOIN nodes ON nodes.path = images.parent
                ORDER BY images.parent, images.captured_at, images.path
                "#,
                qualified_dimensions()
            ))
            .map_err(Error::transaction(stage))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ImageExportRow {
                    node_hash: row.get(0)?,
                    record: ImageRecord {
                        path: row.get(1)?,
                        depth: row.get(2)?,
                        name: row.get(3)?,
                        parent: row.get(4)?,
                        small: row.get(5)?,
                        medium: row.get(6)?,
                        large: row.get(7)?,
                    },
                    dimensions: dimensions_from_row(row, 8)?,
                    exif: ExifData {
                        captured_at: row.get(16)?,
                        fstop: row.get(17)?,
                        exposure_time: row.get(18)?,
                        iso_speed: row.get(19)?,
                        exposure_bias: row.get(20)?,
                        flash: row.get(21)?,
                        metering_mode: row.get(22)?,
                        focal_length: row.get(23)?,
                        focal_length_35mm: row.get(24)?,
                        camera_make: row.get(25)?,
                        camera_model: row.get(26)?,
                        lens_make: row.get(27)?,
                        lens_model: row.get(28)?,
                        software: row.get(29)?,
                        description: row.get(30)?,
                        copyright: row.get(31)?,
                        gps: row.get(32)?,
                        gps_latitude: row.get(33)?,
                        gps_longitude: row.get(34)?,
                        gps_altitude: row.get(35)?,
                    },
                })
            })
            .map_err(Error::transaction(stage))?;

        rows.collect::<rusqlite::Result<_>>()
            .map_err(Error::transaction(stage))
    }

    /// Whether EXIF extraction has completed for `path`.
    pub fn exif_extracted(&self, path: &str) -> Result<bool> {
        let flag: i64 = self
            .conn
            .query_row("SELECT exif FROM images WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .map_err(Error::transaction("exif flag"))?;
        Ok(flag != 0)
    }
}

fn qualified_dimensions() -> String {
    DIMENSION_COLUMNS
        .split(", ")
        .map(|column| format!("images.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
