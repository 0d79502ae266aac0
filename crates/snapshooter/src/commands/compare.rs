use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use snapshooter::config::ResolvedRunConfig;
use snapshooter::{Bitmap, CompareError, Comparator, highlight_difference};

use crate::report::json::CompareReport;
use crate::report::terminal;

const DIFFERENCE_FILE: &str = "difference.png";

/// `snapshooter compare`: score two PNG files against each other.
/// Returns exit code: 0 = pass, 1 = fail.
pub fn compare(
    config: &ResolvedRunConfig,
    reference_path: &Path,
    candidate_path: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<i32> {
    let start = Instant::now();
    let scale = config.store.scale;
    let reference = Bitmap::open(reference_path, scale)
        .with_context(|| format!("Failed to load reference {}", reference_path.display()))?;
    let candidate = Bitmap::open(candidate_path, scale)
        .with_context(|| format!("Failed to load candidate {}", candidate_path.display()))?;

    let comparator = Comparator::new(config.compare);
    let score = match comparator.similarity(&reference, &candidate) {
        Ok(score) => score,
        Err(CompareError::SizeMismatch { .. }) => 0.0,
        Err(e) => return Err(e).context("Failed to compare images"),
    };

    let mut report = CompareReport::new(
        (reference_path, reference.size()),
        (candidate_path, candidate.size()),
        &config.compare,
        score,
    );
    debug!(score, passed = report.passed, "compared images");

    if !report.passed
        && let Some(dir) = output
        && report.reference_size == report.candidate_size
    {
        match highlight_difference(&reference, &candidate) {
            Ok(diff) => {
                let path = dir.join(DIFFERENCE_FILE);
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let png = diff
                    .to_png()
                    .context("Failed to encode difference image")?;
                std::fs::write(&path, png)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                report.difference = Some(path);
            }
            Err(e) => warn!(error = %e, "could not render difference image"),
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
    } else {
        terminal::print_compare_line(&report, start.elapsed());
    }

    Ok(if report.passed { 0 } else { 1 })
}
