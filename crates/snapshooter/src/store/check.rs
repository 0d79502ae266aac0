use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::{Artifacts, SnapshotStore};
use crate::bitmap::{Bitmap, Size};
use crate::compare::diff::highlight_difference;
use crate::compare::{CompareError, CompareOptions, Comparator};

/// Status of a single snapshot check.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotStatus {
    Pass {
        score: f32,
    },
    Fail {
        score: f32,
        reference: PathBuf,
        artifacts: Artifacts,
        /// `Some((reference, candidate))` when the logical sizes differ.
        size_mismatch: Option<(Size, Size)>,
    },
    /// No reference exists. The candidate was written to the output dir.
    New {
        reference: PathBuf,
        artifacts: Artifacts,
    },
}

impl SnapshotStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}

/// Compare `candidate` against the stored reference named `name`.
///
/// 1. No reference: the candidate is saved as an artifact, status `New`.
/// 2. Byte-identical PNG encodings pass without decoding.
/// 3. Otherwise the similarity score is checked against the threshold. On
///    failure the candidate and a difference image are saved.
pub fn check_snapshot(
    store: &SnapshotStore,
    name: &str,
    candidate: &Bitmap,
    options: &CompareOptions,
) -> Result<SnapshotStatus> {
    let Some(stored) = store.load_reference(name)? else {
        let artifacts = store.save_artifacts(name, candidate, None)?;
        info!(name, path = %artifacts.candidate.display(), "no reference snapshot");
        return Ok(SnapshotStatus::New {
            reference: store.reference_path(name),
            artifacts,
        });
    };

    let candidate_png = candidate
        .to_png()
        .with_context(|| format!("Failed to encode candidate for {name}"))?;
    if candidate_png == stored.png {
        debug!(name, "byte-identical to reference");
        store.clean_artifacts(name);
        return Ok(SnapshotStatus::Pass { score: 1.0 });
    }

    let comparator = Comparator::new(*options);
    let (score, size_mismatch) = match comparator.similarity(&stored.bitmap, candidate) {
        Ok(score) => (score, None),
        Err(CompareError::SizeMismatch {
            reference,
            candidate,
        }) => (0.0, Some((reference, candidate))),
        Err(e) => return Err(e).with_context(|| format!("Failed to compare snapshot {name}")),
    };

    if size_mismatch.is_none() && score >= options.threshold {
        debug!(name, score, threshold = options.threshold, "snapshot passed");
        store.clean_artifacts(name);
        return Ok(SnapshotStatus::Pass { score });
    }

    let difference = if size_mismatch.is_none() {
        match highlight_difference(&stored.bitmap, candidate) {
            Ok(diff) => Some(diff),
            Err(e) => {
                warn!(name, error = %e, "could not render difference image");
                None
            }
        }
    } else {
        None
    };

    let artifacts = store.save_artifacts(name, candidate, difference.as_ref())?;
    info!(name, score, threshold = options.threshold, "snapshot failed");
    Ok(SnapshotStatus::Fail {
        score,
        reference: stored.path,
        artifacts,
        size_mismatch,
    })
}

/// Human-readable explanation of a non-passing status.
pub(crate) fn failure_message(name: &str, status: &SnapshotStatus, threshold: f32) -> String {
    let mut msg = String::new();
    match status {
        SnapshotStatus::Pass { .. } => {}
        SnapshotStatus::Fail {
            score,
            reference,
            artifacts,
            size_mismatch,
        } => {
            match size_mismatch {
                Some((r, c)) => {
                    let _ = writeln!(msg, "Snapshot {name} changed size: {r} -> {c}");
                }
                None => {
                    let _ = writeln!(
                        msg,
                        "Snapshot {name} failed with similarity {score:.4} (threshold {threshold:.4})"
                    );
                }
            }
            let _ = writeln!(msg, "  Stored snapshot:     {}", reference.display());
            if let Some(diff) = &artifacts.difference {
                let _ = writeln!(msg, "  Difference snapshot: {}", diff.display());
            }
            let _ = writeln!(msg, "  New snapshot:        {}", artifacts.candidate.display());
        }
        SnapshotStatus::New {
            reference,
            artifacts,
        } => {
            let _ = writeln!(msg, "Snapshot {name} has no reference");
            let _ = writeln!(msg, "  Expected at:  {}", reference.display());
            let _ = writeln!(msg, "  New snapshot: {}", artifacts.candidate.display());
        }
    }
    msg
}

/// Test-harness entry point: panics unless the snapshot passes.
#[track_caller]
pub fn assert_snapshot(
    store: &SnapshotStore,
    name: &str,
    candidate: &Bitmap,
    options: &CompareOptions,
) {
    match check_snapshot(store, name, candidate, options) {
        Ok(SnapshotStatus::Pass { .. }) => {}
        Ok(status) => panic!("{}", failure_message(name, &status, options.threshold)),
        Err(e) => panic!("Snapshot {name} could not be checked: {e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn bitmap(img: RgbaImage) -> Bitmap {
        Bitmap::from_rgba(img, 3.0).unwrap()
    }

    fn solid(w: u32, h: u32, color: [u8; 4]) -> Bitmap {
        bitmap(RgbaImage::from_pixel(w, h, Rgba(color)))
    }

    fn store_with_reference(tmp: &TempDir, name: &str, reference: &Bitmap) -> SnapshotStore {
        let store = SnapshotStore::new(tmp.path().join("Snapshots"))
            .with_output_dir(tmp.path().join("out"));
        std::fs::create_dir_all(store.reference_dir()).unwrap();
        std::fs::write(store.reference_path(name), reference.to_png().unwrap()).unwrap();
        store
    }

    #[test]
    fn missing_reference_is_new() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("Snapshots"))
            .with_output_dir(tmp.path().join("out"));
        let status = check_snapshot(
            &store,
            "HOME",
            &solid(3, 3, [0, 0, 0, 255]),
            &CompareOptions::default(),
        )
        .unwrap();
        match status {
            SnapshotStatus::New { artifacts, .. } => {
                assert!(artifacts.candidate.exists());
                assert!(artifacts.difference.is_none());
            }
            other => panic!("expected New, got {other:?}"),
        }
        // Nothing is recorded as a reference.
        assert!(!store.reference_path("HOME").exists());
    }

    #[test]
    fn identical_snapshot_passes() {
        let tmp = TempDir::new().unwrap();
        let img = solid(30, 30, [255, 0, 0, 255]);
        let store = store_with_reference(&tmp, "HOME", &img);
        let status = check_snapshot(&store, "HOME", &img, &CompareOptions::default()).unwrap();
        assert_eq!(status, SnapshotStatus::Pass { score: 1.0 });
    }

    #[test]
    fn small_change_within_threshold_passes() {
        let tmp = TempDir::new().unwrap();
        let reference = RgbaImage::from_pixel(30, 30, Rgba([40, 40, 40, 255]));
        let mut candidate = reference.clone();
        candidate.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        let store = store_with_reference(&tmp, "HOME", &bitmap(reference));

        let status =
            check_snapshot(&store, "HOME", &bitmap(candidate), &CompareOptions::default()).unwrap();
        match status {
            SnapshotStatus::Pass { score } => assert!(score < 1.0 && score >= 0.98),
            other => panic!("expected Pass, got {other:?}"),
        }
        assert!(!store.candidate_path("HOME").exists());
    }

    #[test]
    fn different_snapshot_fails_with_artifacts() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_reference(&tmp, "HOME", &solid(30, 30, [255, 0, 0, 255]));
        let status = check_snapshot(
            &store,
            "HOME",
            &solid(30, 30, [0, 0, 255, 255]),
            &CompareOptions::default(),
        )
        .unwrap();
        match &status {
            SnapshotStatus::Fail {
                score,
                artifacts,
                size_mismatch,
                ..
            } => {
                assert_eq!(*score, 0.0);
                assert!(size_mismatch.is_none());
                assert!(artifacts.candidate.exists());
                assert!(artifacts.difference.as_ref().unwrap().exists());
            }
            other => panic!("expected Fail, got {other:?}"),
        }
        let msg = failure_message("HOME", &status, 0.98);
        assert!(msg.contains("similarity 0.0000"));
        assert!(msg.contains("Difference-HOME.png"));
    }

    #[test]
    fn resized_snapshot_fails_without_difference() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_reference(&tmp, "HOME", &solid(30, 30, [0, 0, 0, 255]));
        let status = check_snapshot(
            &store,
            "HOME",
            &solid(24, 24, [0, 0, 0, 255]),
            &CompareOptions::default(),
        )
        .unwrap();
        match status {
            SnapshotStatus::Fail {
                score,
                artifacts,
                size_mismatch: Some((r, c)),
                ..
            } => {
                assert_eq!(score, 0.0);
                assert_eq!(r.to_string(), "10x10");
                assert_eq!(c.to_string(), "8x8");
                assert!(artifacts.difference.is_none());
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn placeholder_candidate_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_reference(&tmp, "HOME", &solid(3, 3, [0, 0, 0, 255]));
        let result = check_snapshot(
            &store,
            "HOME",
            &Bitmap::placeholder(),
            &CompareOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "failed with similarity")]
    fn assert_panics_on_failure() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_reference(&tmp, "HOME", &solid(3, 3, [255, 255, 255, 255]));
        assert_snapshot(
            &store,
            "HOME",
            &solid(3, 3, [0, 0, 0, 255]),
            &CompareOptions::default(),
        );
    }

    #[test]
    fn assert_accepts_passing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let img = solid(3, 3, [12, 34, 56, 255]);
        let store = store_with_reference(&tmp, "HOME", &img);
        assert_snapshot(&store, "HOME", &img, &CompareOptions::default());
    }
}
