use std::path::{Path, PathBuf};

use serde::Serialize;

use snapshooter::{CompareOptions, Size};

/// Machine-readable result of `snapshooter compare --json`.
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub reference: PathBuf,
    pub candidate: PathBuf,
    pub reference_size: String,
    pub candidate_size: String,
    pub score: f32,
    pub tolerance: u8,
    pub threshold: f32,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<PathBuf>,
}

impl CompareReport {
    pub fn new(
        (reference, reference_size): (&Path, Size),
        (candidate, candidate_size): (&Path, Size),
        options: &CompareOptions,
        score: f32,
    ) -> Self {
        Self {
            reference: reference.to_path_buf(),
            candidate: candidate.to_path_buf(),
            reference_size: reference_size.to_string(),
            candidate_size: candidate_size.to_string(),
            score,
            tolerance: options.tolerance,
            threshold: options.threshold,
            passed: reference_size == candidate_size && score >= options.threshold,
            difference: None,
        }
    }
}
