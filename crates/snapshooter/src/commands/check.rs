use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use snapshooter::config::ResolvedRunConfig;
use snapshooter::{Bitmap, SnapshotStore, check_snapshot, snapshot_name};

use crate::report::terminal;

/// `snapshooter check`: compare a rendered PNG with its stored reference.
/// Returns exit code: 0 = pass, 1 = fail or new.
pub fn check(config: &ResolvedRunConfig, candidate_path: &Path, name: Option<&str>) -> Result<i32> {
    let name = match name {
        Some(name) => name.to_string(),
        None => {
            let stem = candidate_path
                .file_stem()
                .with_context(|| format!("Cannot derive a name from {}", candidate_path.display()))?;
            snapshot_name(&stem.to_string_lossy())
        }
    };

    let store = SnapshotStore::from_config(&config.store);
    debug!(
        name = %name,
        reference_dir = %store.reference_dir().display(),
        output_dir = %store.output_dir().display(),
        "checking snapshot"
    );

    let start = Instant::now();
    let candidate = Bitmap::open(candidate_path, store.scale())
        .with_context(|| format!("Failed to load candidate {}", candidate_path.display()))?;
    let status = check_snapshot(&store, &name, &candidate, &config.compare)?;
    terminal::print_status_line(&name, &status, start.elapsed());

    Ok(if status.is_pass() { 0 } else { 1 })
}
