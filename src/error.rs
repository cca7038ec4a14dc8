//! Error types shared across the pipeline.
//!
//! [`Error`] covers whole-run and whole-stage failures. Problems with a single
//! photo are reported as [`ExtractionError`] and never abort a stage.

use std::path::PathBuf;
use thiserror::Error;

use crate::imaging::ImagingError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open database {path}: {source}")]
    OpenStore {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("salt file {path}: {source}")]
    Salt {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{stage}: transaction failed: {source}")]
    Transaction {
        stage: &'static str,
        source: rusqlite::Error,
    },

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("export {path}: {source}")]
    Export {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("export {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

impl Error {
    /// Fatal errors abort the run. Everything else is logged and the next
    /// stage continues from the last committed state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::CreateDir { .. }
                | Error::OpenStore { .. }
                | Error::ConfigRead { .. }
                | Error::ConfigParse { .. }
                | Error::Salt { .. }
        )
    }

    pub(crate) fn transaction(stage: &'static str) -> impl FnOnce(rusqlite::Error) -> Error {
        move |source| Error::Transaction { stage, source }
    }
}

/// Failure to extract metadata or derivatives from one source photo.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: malformed EXIF: {source}")]
    Exif { path: PathBuf, source: exif::Error },

    #[error(transparent)]
    Imaging(#[from] ImagingError),
}
