use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use gallerist::config::{Config, ProjectLayout};
use gallerist::imaging::RustBackend;
use gallerist::{logging, pipeline, RunContext};

#[derive(Parser)]
#[command(name = "gallerist")]
#[command(about = "Incremental photo gallery builder")]
#[command(long_about = "\
Incremental photo gallery builder

Mirrors the album tree under the gallery directory into a SQLite store,
extracts EXIF metadata, renders the small/medium/large derivatives that are
missing or stale, and writes nodes.csv, images.csv and list.html.

Album directories may carry '§'-separated metadata after a yymmdd date:

  190601Summer Trip§Beach§Stari Grad§Hvar, Croatia

Only work that changed since the previous run is redone.")]
#[command(version)]
struct Cli {
    /// Project directory holding the gallery, site, data and state dirs
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Config file (defaults to <project>/gallerist.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Watermark text for medium and large derivatives
    #[arg(long)]
    watermark: Option<String>,

    /// Number of worker threads for the parallel passes
    #[arg(long)]
    workers: Option<usize>,

    /// Debug logging unless GALLERIST_LOG says otherwise
    #[arg(long, short)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(&cli.project),
    }
    .context("Failed to load config")?;

    if let Some(text) = &cli.watermark {
        config.watermark.text = text.clone();
    }
    if let Some(workers) = cli.workers {
        config.scanner.workers = Some(workers);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let layout = ProjectLayout::new(&cli.project, &config.layout);
    logging::init(Some(layout.logs_dir()), cli.verbose)
        .context("Failed to initialize logging")?;

    let quality = config.derivatives.jpeg_quality;
    let ctx = RunContext::setup(&cli.project, config).context("Failed to set up project")?;
    let backend = RustBackend::new(quality);

    let report = pipeline::run(&ctx, &backend).context("Gallery run aborted")?;

    if let Some(images) = &report.images {
        info!(
            "{} image(s) tracked, {} pruned",
            images.discovered, images.pruned
        );
    }
    if let Some(derivatives) = &report.derivatives {
        info!(
            "{} derivative(s) written, {} cache hit(s)",
            derivatives.tiers_written, derivatives.cache_hits
        );
    }
    for (stage, reason) in &report.failed_stages {
        warn!("Stage {} did not complete: {}", stage, reason);
    }

    Ok(())
}
