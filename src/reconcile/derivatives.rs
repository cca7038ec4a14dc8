use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{merge, WorkerBuffer};
use crate::config::{DerivativeConfig, WatermarkConfig};
use crate::db::{Database, DerivativeCandidate};
use crate::error::{ExtractionError, Result};
use crate::imaging::{ImageBackend, RenderSpec, WatermarkSpec};
use crate::model::{Dimensions, ImageDimensions, Tier};
use crate::parallel::{self, Progress};

/// Render settings for all three tiers, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativePlan {
    pub small: RenderSpec,
    pub medium: RenderSpec,
    pub large: RenderSpec,
}

impl DerivativePlan {
    pub fn new(derivatives: &DerivativeConfig, watermark: &WatermarkConfig) -> Self {
        let mark = |font_size, margin| {
            (!watermark.text.is_empty()).then(|| WatermarkSpec {
                text: watermark.text.clone(),
                font_size,
                margin,
            })
        };

        Self {
            small: RenderSpec::Crop {
                width: derivatives.small_width,
                height: derivatives.small_height,
            },
            medium: RenderSpec::Fit {
                size: derivatives.medium_size,
                watermark: mark(watermark.medium_font_size, watermark.medium_margin),
            },
            large: RenderSpec::Fit {
                size: derivatives.large_size,
                watermark: mark(watermark.large_font_size, watermark.large_margin),
            },
        }
    }

    pub fn spec(&self, tier: Tier) -> &RenderSpec {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::Large => &self.large,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivativeReport {
    pub candidates: usize,
    pub cache_hits: usize,
    pub rendered: usize,
    pub tiers_written: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// `<cache>/<tier>/<node hash>/<derivative id>.jpg`
pub fn derivative_path(cache_root: &Path, tier: Tier, node_hash: &str, id: &str) -> PathBuf {
    cache_root
        .join(tier.name())
        .join(node_hash)
        .join(format!("{}.jpg", id))
}

fn candidate_id(candidate: &DerivativeCandidate, tier: Tier) -> &str {
    match tier {
        Tier::Small => &candidate.small,
        Tier::Medium => &candidate.medium,
        Tier::Large => &candidate.large,
    }
}

/// Tiers whose file is missing or whose dimensions were never recorded.
pub fn stale_tiers(candidate: &DerivativeCandidate, cache_root: &Path) -> Vec<Tier> {
    Tier::ALL
        .into_iter()
        .filter(|&tier| {
            let path = derivative_path(
                cache_root,
                tier,
                &candidate.node_hash,
                candidate_id(candidate, tier),
            );
            !path.is_file() || !candidate.dimensions.tier(tier).is_known()
        })
        .collect()
}

/// Decode the source once and render every stale tier from it.
fn render_stale(
    candidate: &DerivativeCandidate,
    stale: &[Tier],
    backend: &dyn ImageBackend,
    gallery_root: &Path,
    cache_root: &Path,
    plan: &DerivativePlan,
) -> std::result::Result<ImageDimensions, ExtractionError> {
    let source = backend.decode(&gallery_root.join(&candidate.path))?;

    let mut dims = candidate.dimensions;
    dims.source = Dimensions::new(source.width(), source.height());

    for &tier in stale {
        let output = derivative_path(
            cache_root,
            tier,
            &candidate.node_hash,
            candidate_id(candidate, tier),
        );
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ExtractionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let written = backend.render(&source, plan.spec(tier), &output)?;
        debug!("Wrote {} {}x{}", output.display(), written.width, written.height);
        dims.set_tier(tier, written);
    }

    Ok(dims)
}

/// Bring every tier of every image up to date.
///
/// Images with all three files present and dimensions known are never
/// decoded. Dimension updates are collected per worker and written in one
/// transaction after all workers have finished.
pub fn reconcile_derivatives(
    db: &mut Database,
    backend: &dyn ImageBackend,
    gallery_root: &Path,
    cache_root: &Path,
    plan: &DerivativePlan,
    workers: usize,
) -> Result<DerivativeReport> {
    let start = Instant::now();
    let candidates = db.derivative_candidates()?;
    let progress = Progress::new("Derivatives", candidates.len());

    let buffers = parallel::run(candidates.len(), workers, |range| {
        let mut buffer = WorkerBuffer::default();
        let mut cache_hits = 0;
        let mut tiers_written = 0;

        for candidate in &candidates[range.lower..range.upper] {
            let stale = stale_tiers(candidate, cache_root);
            if stale.is_empty() {
                cache_hits += 1;
            } else {
                match render_stale(candidate, &stale, backend, gallery_root, cache_root, plan) {
                    Ok(dims) => {
                        tiers_written += stale.len();
                        buffer.results.push((candidate.path.clone(), dims));
                    }
                    Err(e) => {
                        warn!("Derivatives for {} failed: {}", candidate.path, e);
                        buffer.failed += 1;
                    }
                }
            }
            progress.tick();
        }
        (buffer, cache_hits, tiers_written)
    })?;

    let mut cache_hits = 0;
    let mut tiers_written = 0;
    let buffers: Vec<_> = buffers
        .into_iter()
        .map(|(buffer, hits, written)| {
            cache_hits += hits;
            tiers_written += written;
            buffer
        })
        .collect();

    let (updates, failed) = merge(buffers);
    let rendered = updates.len();
    if !updates.is_empty() {
        db.apply_dimensions(&updates)?;
    }

    let report = DerivativeReport {
        candidates: candidates.len(),
        cache_hits,
        rendered,
        tiers_written,
        failed,
        elapsed: start.elapsed(),
    };
    info!(
        "Derivatives: {} images, {} cached, {} rendered ({} files), {} failed in {}ms",
        report.candidates,
        report.cache_hits,
        report.rendered,
        report.tiers_written,
        report.failed,
        report.elapsed.as_millis()
    );
    Ok(report)
}
