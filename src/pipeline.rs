//! Stage sequencing for one gallery run.
//!
//! Setup produces an immutable [`RunContext`]; each stage then reads the
//! committed store and commits its own output before the next one starts.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::{Config, ProjectLayout};
use crate::db::{self, Database};
use crate::error::Result;
use crate::export::{self, ExportReport, ExportTargets};
use crate::imaging::ImageBackend;
use crate::reconcile::{self, DerivativePlan, DerivativeReport, ExifReport};
use crate::scanner::{self, Salts, SyncReport};

/// Everything a run needs, resolved once before any stage starts.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub layout: ProjectLayout,
    pub salts: Salts,
    pub workers: usize,
    pub plan: DerivativePlan,
    pub run_started: String,
}

impl RunContext {
    /// Create the project directories and load (or create) the salts.
    pub fn setup(project_root: &Path, config: Config) -> Result<Self> {
        let layout = ProjectLayout::new(project_root, &config.layout);
        layout.create_directories()?;

        let salts = Salts::load_or_create(&layout.state)?;
        let workers = config.worker_count();
        let plan = DerivativePlan::new(&config.derivatives, &config.watermark);

        Ok(Self {
            config,
            layout,
            salts,
            workers,
            plan,
            run_started: db::now_timestamp(),
        })
    }

    pub fn export_targets(&self) -> ExportTargets {
        ExportTargets::new(
            &self.layout.data,
            &self.layout.state,
            &self.layout.cache_dir_name,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SyncNodes,
    SyncImages,
    Exif,
    Derivatives,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::SyncNodes,
        Stage::SyncImages,
        Stage::Exif,
        Stage::Derivatives,
        Stage::Export,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SyncNodes => "sync nodes",
            Stage::SyncImages => "sync images",
            Stage::Exif => "exif",
            Stage::Derivatives => "derivatives",
            Stage::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub nodes: Option<SyncReport>,
    pub images: Option<SyncReport>,
    pub exif: Option<ExifReport>,
    pub derivatives: Option<DerivativeReport>,
    pub export: Option<ExportReport>,
    /// Stages whose work was abandoned, with the logged reason.
    pub failed_stages: Vec<(Stage, String)>,
    /// Stages never started because an earlier stage they depend on failed.
    pub skipped_stages: Vec<Stage>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed_stages.is_empty() && self.skipped_stages.is_empty()
    }
}

/// Run a stage; fatal errors propagate, everything else is logged.
fn run_stage<T>(
    report: &mut RunReport,
    stage: Stage,
    work: impl FnOnce() -> Result<T>,
) -> Result<Option<T>> {
    match work() {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            error!("Stage {} failed: {}", stage, e);
            report.failed_stages.push((stage, e.to_string()));
            Ok(None)
        }
    }
}

/// Open the store and run every stage in order.
pub fn run(ctx: &RunContext, backend: &dyn ImageBackend) -> Result<RunReport> {
    let start = Instant::now();
    info!(
        "Run started at {} ({} workers)",
        ctx.run_started, ctx.workers
    );

    let mut db = Database::open(&ctx.layout.database)?;
    db.initialize()?;

    let mut report = RunReport::default();
    let gallery = &ctx.layout.gallery;

    report.nodes = run_stage(&mut report, Stage::SyncNodes, || {
        scanner::sync_nodes(&mut db, gallery)
    })?;

    // Images reference their nodes; nothing downstream can run on a node
    // table that did not commit.
    if report.nodes.is_none() {
        report.skipped_stages = Stage::ALL[1..].to_vec();
        warn!(
            "Node sync failed, skipping {} later stage(s)",
            report.skipped_stages.len()
        );
        return Ok(finish(report, start));
    }

    report.images = run_stage(&mut report, Stage::SyncImages, || {
        scanner::sync_images(
            &mut db,
            gallery,
            &ctx.config.scanner.image_extensions,
            &ctx.salts,
        )
    })?;

    report.exif = run_stage(&mut report, Stage::Exif, || {
        reconcile::reconcile_exif(&mut db, gallery, ctx.workers)
    })?;

    report.derivatives = run_stage(&mut report, Stage::Derivatives, || {
        reconcile::reconcile_derivatives(
            &mut db,
            backend,
            gallery,
            &ctx.layout.cache,
            &ctx.plan,
            ctx.workers,
        )
    })?;

    let targets = ctx.export_targets();
    report.export = run_stage(&mut report, Stage::Export, || {
        export::export_all(&db, &targets)
    })?;

    Ok(finish(report, start))
}

fn finish(mut report: RunReport, start: Instant) -> RunReport {
    report.elapsed = start.elapsed();
    info!(
        "Run finished in {}ms ({} stage(s) failed, {} skipped)",
        report.elapsed.as_millis(),
        report.failed_stages.len(),
        report.skipped_stages.len()
    );
    report
}
