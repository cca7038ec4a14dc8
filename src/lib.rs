//! Incremental photo gallery builder.
//!
//! A gallery is a directory tree of albums. Each run mirrors the tree into a
//! SQLite store, extracts EXIF for images that have none yet, renders the
//! cached derivative sizes that are missing or stale, and writes the CSV and
//! HTML listings the site generator consumes.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod imaging;
pub mod logging;
pub mod model;
pub mod parallel;
pub mod pipeline;
pub mod reconcile;
pub mod scanner;

pub use config::{Config, ProjectLayout};
pub use error::{Error, Result};
pub use pipeline::{run, RunContext, RunReport};
