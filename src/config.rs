use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the optional config file at the project root.
pub const CONFIG_FILE: &str = "gallerist.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub derivatives: DerivativeConfig,

    #[serde(default)]
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_gallery_dir")]
    pub gallery_dir: String,

    #[serde(default = "default_site_dir")]
    pub site_dir: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Holds the database, salts, logs and the HTML listing.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Relative to the site directory.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_gallery_dir() -> String {
    "_gallery".to_string()
}

fn default_site_dir() -> String {
    "_site".to_string()
}

fn default_data_dir() -> String {
    "_data".to_string()
}

fn default_state_dir() -> String {
    "_gallerist".to_string()
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

fn default_database_file() -> String {
    "database.sqlite3".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gallery_dir: default_gallery_dir(),
            site_dir: default_site_dir(),
            data_dir: default_data_dir(),
            state_dir: default_state_dir(),
            cache_dir: default_cache_dir(),
            database_file: default_database_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Worker threads for the EXIF and derivative passes.
    /// Defaults to the available hardware parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_image_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "jpe".to_string()]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativeConfig {
    #[serde(default = "default_small_width")]
    pub small_width: u32,

    #[serde(default = "default_small_height")]
    pub small_height: u32,

    /// Long edge of the medium tier.
    #[serde(default = "default_medium_size")]
    pub medium_size: u32,

    /// Long edge of the large tier.
    #[serde(default = "default_large_size")]
    pub large_size: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_small_width() -> u32 {
    292
}

fn default_small_height() -> u32 {
    292
}

fn default_medium_size() -> u32 {
    800
}

fn default_large_size() -> u32 {
    1440
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            small_width: default_small_width(),
            small_height: default_small_height(),
            medium_size: default_medium_size(),
            large_size: default_large_size(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Stamped onto medium and large derivatives. Empty disables it.
    #[serde(default)]
    pub text: String,

    #[serde(default = "default_medium_font_size")]
    pub medium_font_size: u32,

    #[serde(default = "default_medium_margin")]
    pub medium_margin: u32,

    #[serde(default = "default_large_font_size")]
    pub large_font_size: u32,

    #[serde(default = "default_large_margin")]
    pub large_margin: u32,
}

fn default_medium_font_size() -> u32 {
    24
}

fn default_medium_margin() -> u32 {
    16
}

fn default_large_font_size() -> u32 {
    36
}

fn default_large_margin() -> u32 {
    32
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            medium_font_size: default_medium_font_size(),
            medium_margin: default_medium_margin(),
            large_font_size: default_large_font_size(),
            large_margin: default_large_margin(),
        }
    }
}

impl Config {
    /// Load `gallerist.toml` from the project root, or defaults if absent.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Worker count for the parallel passes.
    pub fn worker_count(&self) -> usize {
        self.scanner
            .workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }
}

/// Absolute directories of one gallery project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub gallery: PathBuf,
    pub site: PathBuf,
    pub cache: PathBuf,
    pub data: PathBuf,
    pub state: PathBuf,
    pub database: PathBuf,
    /// Cache directory name as it appears in public URLs.
    pub cache_dir_name: String,
}

impl ProjectLayout {
    pub fn new(root: &Path, layout: &LayoutConfig) -> Self {
        let site = root.join(&layout.site_dir);
        let state = root.join(&layout.state_dir);
        Self {
            root: root.to_path_buf(),
            gallery: root.join(&layout.gallery_dir),
            cache: site.join(&layout.cache_dir),
            data: root.join(&layout.data_dir),
            database: state.join(&layout.database_file),
            cache_dir_name: layout.cache_dir.clone(),
            site,
            state,
        }
    }

    /// Create every directory the pipeline writes into.
    pub fn create_directories(&self) -> Result<()> {
        for dir in [&self.state, &self.gallery, &self.site, &self.cache, &self.data] {
            std::fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state.join("logs")
    }
}
