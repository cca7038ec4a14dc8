//! CSV and HTML projections of the `nodes` and `images` tables.
//!
//! Exports carry no timestamps, so re-running against an unchanged model
//! rewrites byte-identical files.

use csv::{QuoteStyle, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::db::{Database, ImageExportRow};
use crate::error::{Error, Result};
use crate::model::{GalleryNode, Tier};

pub const NODES_CSV: &str = "nodes.csv";
pub const IMAGES_CSV: &str = "images.csv";
pub const LISTING_HTML: &str = "list.html";

const NODE_COLUMNS: [&str; 11] = [
    "hash",
    "path",
    "depth",
    "name",
    "url",
    "captured_at",
    "title",
    "event",
    "location",
    "city",
    "country",
];

const IMAGE_COLUMNS: [&str; 32] = [
    "node_hash",
    "small_hash",
    "medium_hash",
    "large_hash",
    "small_path",
    "medium_path",
    "large_path",
    "width",
    "height",
    "large_width",
    "large_height",
    "medium_width",
    "medium_height",
    "small_width",
    "small_height",
    "captured_at",
    "fstop",
    "exposure_time",
    "iso_speed",
    "exposure_bias",
    "flash",
    "metering_mode",
    "focal_length",
    "focal_length_35mm",
    "camera_make",
    "camera_model",
    "lens_make",
    "lens_model",
    "software",
    "description",
    "copyright",
    "gps",
];

/// Where each export lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTargets {
    pub nodes_csv: PathBuf,
    pub images_csv: PathBuf,
    pub listing_html: PathBuf,
    /// Cache directory name as it appears in public URLs.
    pub cache_dir_name: String,
}

impl ExportTargets {
    pub fn new(data_dir: &Path, state_dir: &Path, cache_dir_name: &str) -> Self {
        Self {
            nodes_csv: data_dir.join(NODES_CSV),
            images_csv: data_dir.join(IMAGES_CSV),
            listing_html: state_dir.join(LISTING_HTML),
            cache_dir_name: cache_dir_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub nodes: usize,
    pub images: usize,
}

/// Write every export from the committed model.
pub fn export_all(db: &Database, targets: &ExportTargets) -> Result<ExportReport> {
    let start = Instant::now();
    let nodes = db.export_nodes()?;
    let images = db.export_images()?;

    export_nodes_csv(&nodes, &targets.nodes_csv)?;
    export_images_csv(&images, &targets.cache_dir_name, &targets.images_csv)?;
    export_html(&nodes, &images, &targets.cache_dir_name, &targets.listing_html)?;

    info!(
        "Exported {} nodes and {} images in {}ms",
        nodes.len(),
        images.len(),
        start.elapsed().as_millis()
    );
    Ok(ExportReport {
        nodes: nodes.len(),
        images: images.len(),
    })
}

/// Public URL path of one derivative.
pub fn public_path(cache_dir_name: &str, tier: Tier, node_hash: &str, id: &str) -> String {
    format!("/{}/{}/{}/{}.jpg", cache_dir_name, tier.name(), node_hash, id)
}

/// GPS string with its symbols as HTML entities.
pub fn gps_entities(gps: &str) -> String {
    gps.replace('°', "&deg;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn node_record(node: &GalleryNode) -> [String; 11] {
    [
        node.hash.clone(),
        node.path.clone(),
        node.depth.to_string(),
        node.name.clone(),
        node.url.clone(),
        node.meta.captured_at.clone(),
        node.meta.title.clone(),
        node.meta.event.clone(),
        node.meta.location.clone(),
        node.meta.city.clone(),
        node.meta.country.clone(),
    ]
}

fn image_record(row: &ImageExportRow, cache_dir_name: &str) -> Vec<String> {
    let record = &row.record;
    let dims = &row.dimensions;
    let exif = &row.exif;
    vec![
        row.node_hash.clone(),
        record.small.clone(),
        record.medium.clone(),
        record.large.clone(),
        public_path(cache_dir_name, Tier::Small, &row.node_hash, &record.small),
        public_path(cache_dir_name, Tier::Medium, &row.node_hash, &record.medium),
        public_path(cache_dir_name, Tier::Large, &row.node_hash, &record.large),
        dims.source.width.to_string(),
        dims.source.height.to_string(),
        dims.large.width.to_string(),
        dims.large.height.to_string(),
        dims.medium.width.to_string(),
        dims.medium.height.to_string(),
        dims.small.width.to_string(),
        dims.small.height.to_string(),
        exif.captured_at.clone(),
        exif.fstop.clone(),
        exif.exposure_time.clone(),
        exif.iso_speed.clone(),
        exif.exposure_bias.clone(),
        exif.flash.clone(),
        exif.metering_mode.clone(),
        exif.focal_length.clone(),
        exif.focal_length_35mm.clone(),
        exif.camera_make.clone(),
        exif.camera_model.clone(),
        exif.lens_make.clone(),
        exif.lens_model.clone(),
        exif.software.clone(),
        exif.description.clone(),
        exif.copyright.clone(),
        gps_entities(&exif.gps),
    ]
}

pub fn export_nodes_csv(nodes: &[GalleryNode], output_path: &Path) -> Result<()> {
    let csv_err = |source| Error::Csv {
        path: output_path.to_path_buf(),
        source,
    };
    let mut wtr = csv_writer(output_path)?;

    wtr.write_record(NODE_COLUMNS).map_err(csv_err)?;
    for node in nodes {
        wtr.write_record(node_record(node)).map_err(csv_err)?;
    }

    wtr.flush().map_err(|source| Error::Export {
        path: output_path.to_path_buf(),
        source,
    })
}

pub fn export_images_csv(
    images: &[ImageExportRow],
    cache_dir_name: &str,
    output_path: &Path,
) -> Result<()> {
    let csv_err = |source| Error::Csv {
        path: output_path.to_path_buf(),
        source,
    };
    let mut wtr = csv_writer(output_path)?;

    wtr.write_record(IMAGE_COLUMNS).map_err(csv_err)?;
    for row in images {
        wtr.write_record(image_record(row, cache_dir_name))
            .map_err(csv_err)?;
    }

    wtr.flush().map_err(|source| Error::Export {
        path: output_path.to_path_buf(),
        source,
    })
}

fn push_table<I, R>(html: &mut String, title: &str, headers: &[&str], rows: I)
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    html.push_str(&format!("    <h2>{}</h2>\n    <table>\n        <tr>", html_escape(title)));
    for header in headers {
        html.push_str(&format!("<th>{}</th>", html_escape(header)));
    }
    html.push_str("</tr>\n");

    for row in rows {
        html.push_str("        <tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", html_escape(&cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("    </table>\n");
}

pub fn export_html(
    nodes: &[GalleryNode],
    images: &[ImageExportRow],
    cache_dir_name: &str,
    output_path: &Path,
) -> Result<()> {
    let mut html = String::new();

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Gallery Listing</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0 auto;
            padding: 20px;
            background: #1a1a1a;
            color: #e0e0e0;
        }
        h1, h2 {
            color: #4fc3f7;
        }
        table {
            border-collapse: collapse;
            margin-bottom: 40px;
            font-size: 12px;
        }
        th, td {
            padding: 4px 8px;
            text-align: left;
            border-bottom: 1px solid #404040;
            white-space: nowrap;
        }
        th {
            background: #2d2d2d;
            color: #4fc3f7;
        }
        tr:hover {
            background: #333;
        }
    </style>
</head>
<body>
    <h1>Gallery Listing</h1>
"#,
    );

    html.push_str(&format!(
        "    <p><strong>Nodes:</strong> {} <strong>Images:</strong> {}</p>\n",
        nodes.len(),
        images.len()
    ));

    push_table(&mut html, "Nodes", &NODE_COLUMNS, nodes.iter().map(node_record));

    // The images table shows the raw GPS string; entity encoding happens in
    // the escape step.
    push_table(
        &mut html,
        "Images",
        &IMAGE_COLUMNS,
        images.iter().map(|row| {
            let mut cells = image_record(row, cache_dir_name);
            if let Some(gps) = cells.last_mut() {
                *gps = row.exif.gps.clone();
            }
            cells
        }),
    );

    html.push_str("</body>\n</html>\n");

    let mut file = File::create(output_path).map_err(|source| Error::Export {
        path: output_path.to_path_buf(),
        source,
    })?;
    file.write_all(html.as_bytes())
        .map_err(|source| Error::Export {
            path: output_path.to_path_buf(),
            source,
        })
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dimensions, ExifData, GalleryMeta, ImageDimensions, ImageRecord};
    use tempfile::tempdir;

    fn node() -> GalleryNode {
        GalleryNode {
            path: "2023/Trip § Reunion".to_string(),
            depth: 1,
            name: "Trip § Reunion".to_string(),
            url: "2023-trip".to_string(),
            hash: "00000000000000aa".to_string(),
            meta: GalleryMeta {
                title: "Trip".to_string(),
                event: "Reunion".to_string(),
                ..GalleryMeta::default()
            },
        }
    }

    fn image() -> ImageExportRow {
        ImageExportRow {
            node_hash: "00000000000000aa".to_string(),
            record: ImageRecord {
                path: "2023/Trip § Reunion/a.jpg".to_string(),
                depth: 2,
                name: "a.jpg".to_string(),
                parent: "2023/Trip § Reunion".to_string(),
                small: "1111111111111111".to_string(),
                medium: "2222222222222222".to_string(),
                large: "3333333333333333".to_string(),
            },
            dimensions: ImageDimensions {
                source: Dimensions::new(4000, 3000),
                small: Dimensions::new(292, 292),
                medium: Dimensions::new(800, 600),
                large: Dimensions::new(1440, 1080),
            },
            exif: ExifData {
                camera_make: "Nikon".to_string(),
                gps: "48°51'36\" N 2°21'8\" E".to_string(),
                ..ExifData::default()
            },
        }
    }

    #[test]
    fn test_public_path() {
        assert_eq!(
            public_path("cache", Tier::Medium, "00000000000000aa", "2222222222222222"),
            "/cache/medium/00000000000000aa/2222222222222222.jpg"
        );
    }

    #[test]
    fn test_gps_entities() {
        assert_eq!(
            gps_entities("48°51'36\" N"),
            "48&deg;51&apos;36&quot; N"
        );
    }

    #[test]
    fn test_nodes_csv_quotes_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(NODES_CSV);
        export_nodes_csv(&[node()], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"hash\",\"path\",\"depth\",\"name\",\"url\",\"captured_at\",\"title\",\"event\",\"location\",\"city\",\"country\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"00000000000000aa\",\"2023/Trip § Reunion\",\"1\",\"Trip § Reunion\",\"2023-trip\",\"\",\"Trip\",\"Reunion\",\"\",\"\",\"\""
        );
    }

    #[test]
    fn test_images_csv_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(IMAGES_CSV);
        export_images_csv(&[image()], "cache", &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), IMAGE_COLUMNS.len());

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[4], "/cache/small/00000000000000aa/1111111111111111.jpg");
        assert_eq!(&record[7], "4000");
        assert_eq!(&record[9], "1440");
        assert_eq!(&record[24], "Nikon");
        assert_eq!(&record[31], "48&deg;51&apos;36&quot; N 2&deg;21&apos;8&quot; E");
    }

    #[test]
    fn test_html_escapes_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LISTING_HTML);
        let mut row = image();
        row.exif.description = "<b>&</b>".to_string();
        export_html(&[node()], &[row], "cache", &path).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<td>&lt;b&gt;&amp;&lt;/b&gt;</td>"));
        assert!(html.contains("<td>48°51&#39;36&quot; N 2°21&#39;8&quot; E</td>"));
        assert!(html.contains("<strong>Nodes:</strong> 1"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">'"), "&lt;a href=&quot;x&quot;&gt;&#39;");
    }
}
