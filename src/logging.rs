//! Logging configuration.
//!
//! Progress and stage timings go to stderr. When a log directory is given,
//! the same events are also written to a daily rolling file so that
//! unattended runs leave a trail.

use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initialize the logging system.
///
/// Log level can be controlled via the `GALLERIST_LOG` environment variable:
/// - `GALLERIST_LOG=debug` for verbose output
/// - `GALLERIST_LOG=info` for standard output (default)
/// - `GALLERIST_LOG=warn` for warnings and errors only
///
/// `verbose` raises the default to `debug` when the variable is unset.
pub fn init(log_dir: Option<PathBuf>, verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_env("GALLERIST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let file_appender = tracing_appender::rolling::daily(&dir, "gallerist.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Dropping the guard would stop the background writer.
            let _ = GUARD.set(guard);
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
