mod check;
mod naming;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::config::StoreConfig;

pub use self::check::{SnapshotStatus, assert_snapshot, check_snapshot};
pub use self::naming::{current_test_snapshot_name, snapshot_name};

/// Display scale reference PNGs are loaded at unless configured otherwise.
pub const DEFAULT_SCALE: f32 = 3.0;
pub const SNAPSHOTS_DIR: &str = "Snapshots";
const DIFFERENCE_PREFIX: &str = "Difference-";

/// Scratch location for failure artifacts.
pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join(SNAPSHOTS_DIR)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn write_png(path: &Path, bitmap: &Bitmap) -> Result<()> {
    ensure_parent(path)?;
    let png = bitmap
        .to_png()
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    std::fs::write(path, png).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// A reference snapshot read from disk.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub path: PathBuf,
    /// Encoded bytes as stored, for the byte-identical fast path.
    pub png: Vec<u8>,
    pub bitmap: Bitmap,
}

/// Files written for a failing or new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub candidate: PathBuf,
    pub difference: Option<PathBuf>,
}

/// Reference PNGs live in `reference_dir`; failure artifacts go to
/// `output_dir`. Files are named `<NAME>.png` and `Difference-<NAME>.png`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    reference_dir: PathBuf,
    output_dir: PathBuf,
    scale: f32,
}

impl SnapshotStore {
    pub fn new(reference_dir: impl Into<PathBuf>) -> Self {
        Self {
            reference_dir: reference_dir.into(),
            output_dir: default_output_dir(),
            scale: DEFAULT_SCALE,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            reference_dir: config.reference_dir.clone(),
            output_dir: config.output_dir.clone().unwrap_or_else(default_output_dir),
            scale: config.scale,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn reference_path(&self, name: &str) -> PathBuf {
        self.reference_dir.join(format!("{name}.png"))
    }

    pub fn candidate_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.png"))
    }

    pub fn difference_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{DIFFERENCE_PREFIX}{name}.png"))
    }

    /// Read and decode `<reference_dir>/<name>.png`. `Ok(None)` if it does
    /// not exist.
    pub fn load_reference(&self, name: &str) -> Result<Option<StoredSnapshot>> {
        let path = self.reference_path(name);
        let png = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let bitmap = Bitmap::from_encoded(&png, self.scale)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        debug!(path = %path.display(), size = %bitmap.size(), "loaded reference");
        Ok(Some(StoredSnapshot { path, png, bitmap }))
    }

    /// Write the candidate and, if given, the difference image. A stale
    /// difference file from an earlier run is removed when none is given.
    pub fn save_artifacts(
        &self,
        name: &str,
        candidate: &Bitmap,
        difference: Option<&Bitmap>,
    ) -> Result<Artifacts> {
        let candidate_path = self.candidate_path(name);
        write_png(&candidate_path, candidate)?;

        let difference_path = match difference {
            Some(diff) => {
                let path = self.difference_path(name);
                write_png(&path, diff)?;
                Some(path)
            }
            None => {
                let _ = std::fs::remove_file(self.difference_path(name));
                None
            }
        };

        debug!(name, output = %self.output_dir.display(), "saved artifacts");
        Ok(Artifacts {
            candidate: candidate_path,
            difference: difference_path,
        })
    }

    /// Remove artifacts left by an earlier failing run.
    pub fn clean_artifacts(&self, name: &str) {
        let _ = std::fs::remove_file(self.candidate_path(name));
        let _ = std::fs::remove_file(self.difference_path(name));
    }
}
