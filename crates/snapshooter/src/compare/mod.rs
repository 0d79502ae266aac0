pub mod diff;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::bitmap::{Bitmap, Size};
use crate::pixels::{Decoder, ExtractError, PixelBuffer, PremultipliedRgba};

/// Default per-channel tolerance: exact match.
pub const DEFAULT_TOLERANCE: u8 = 0;

/// Default minimum similarity for a snapshot to pass.
pub const DEFAULT_THRESHOLD: f32 = 0.98;

/// Which input of a comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reference,
    Candidate,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reference => "reference",
            Self::Candidate => "candidate",
        })
    }
}

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("images are different sizes: reference {reference}, candidate {candidate}")]
    SizeMismatch { reference: Size, candidate: Size },

    #[error("{side} image has no decodable pixel data")]
    EmptyImage { side: Side },

    #[error("failed to extract {side} pixels")]
    BufferError {
        side: Side,
        #[source]
        source: ExtractError,
    },
}

/// Tolerance and pass threshold for a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Maximum absolute difference per channel for two pixels to count as equal.
    pub tolerance: u8,
    /// Minimum similarity (0.0-1.0) for a comparison to pass.
    pub threshold: f32,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CompareOptions {
    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Outcome of scoring against a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub score: f32,
    pub passed: bool,
}

/// Input validation shared by scoring and diffing.
pub(crate) enum Precondition {
    Empty(Side),
    SizeMismatch { reference: Size, candidate: Size },
}

impl From<Precondition> for CompareError {
    fn from(p: Precondition) -> Self {
        match p {
            Precondition::Empty(side) => Self::EmptyImage { side },
            Precondition::SizeMismatch {
                reference,
                candidate,
            } => Self::SizeMismatch {
                reference,
                candidate,
            },
        }
    }
}

fn has_no_pixels(bitmap: &Bitmap) -> bool {
    let (width, height) = bitmap.pixel_dimensions();
    bitmap.is_placeholder() || width == 0 || height == 0
}

/// Placeholders and zero-area images are rejected before sizes are looked
/// at: they have no size worth comparing. Equal logical sizes at different
/// scales still disagree on the pixel grid, which is a mismatch too.
pub(crate) fn check_inputs(reference: &Bitmap, candidate: &Bitmap) -> Result<(), Precondition> {
    if has_no_pixels(reference) {
        return Err(Precondition::Empty(Side::Reference));
    }
    if has_no_pixels(candidate) {
        return Err(Precondition::Empty(Side::Candidate));
    }
    if reference.size() != candidate.size()
        || reference.pixel_dimensions() != candidate.pixel_dimensions()
    {
        return Err(Precondition::SizeMismatch {
            reference: reference.size(),
            candidate: candidate.size(),
        });
    }
    Ok(())
}

/// Scores bitmaps with a [`Decoder`] and a set of [`CompareOptions`].
#[derive(Debug, Clone)]
pub struct Comparator<D = PremultipliedRgba> {
    options: CompareOptions,
    decoder: D,
}

impl Comparator {
    pub fn new(options: CompareOptions) -> Self {
        Self {
            options,
            decoder: PremultipliedRgba,
        }
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(CompareOptions::default())
    }
}

impl<D: Decoder> Comparator<D> {
    pub fn with_decoder(options: CompareOptions, decoder: D) -> Self {
        Self { options, decoder }
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Fraction of pixels whose four channels all match within tolerance.
    pub fn similarity(&self, reference: &Bitmap, candidate: &Bitmap) -> Result<f32, CompareError> {
        check_inputs(reference, candidate)?;

        let reference_px = self
            .decoder
            .decode(reference)
            .map_err(|source| CompareError::BufferError {
                side: Side::Reference,
                source,
            })?;
        let candidate_px = self
            .decoder
            .decode(candidate)
            .map_err(|source| CompareError::BufferError {
                side: Side::Candidate,
                source,
            })?;

        if reference_px.dimensions() != candidate_px.dimensions() {
            return Err(CompareError::SizeMismatch {
                reference: reference.size(),
                candidate: candidate.size(),
            });
        }

        let score = score_buffers(&reference_px, &candidate_px, self.options.tolerance);
        debug!(
            score,
            tolerance = self.options.tolerance,
            pixels = reference_px.pixel_count(),
            "scored similarity"
        );
        Ok(score)
    }

    /// Score and check the result against the configured threshold.
    pub fn compare(&self, reference: &Bitmap, candidate: &Bitmap) -> Result<Verdict, CompareError> {
        let score = self.similarity(reference, candidate)?;
        Ok(Verdict {
            score,
            passed: score >= self.options.threshold,
        })
    }
}

/// Similarity of `reference` and `candidate` under `tolerance`, using the
/// default decoder.
pub fn similarity(
    reference: &Bitmap,
    candidate: &Bitmap,
    tolerance: u8,
) -> Result<f32, CompareError> {
    Comparator::new(CompareOptions::default().with_tolerance(tolerance))
        .similarity(reference, candidate)
}

/// Count pixels whose channels all differ by at most `tolerance`, as a
/// fraction of the total. Both buffers must have the same dimensions.
///
/// Two empty buffers score 1.0; nothing in them differs.
pub fn score_buffers(reference: &PixelBuffer, candidate: &PixelBuffer, tolerance: u8) -> f32 {
    debug_assert_eq!(reference.dimensions(), candidate.dimensions());
    let total = reference.pixel_count();
    if total == 0 {
        return 1.0;
    }
    let similar = reference
        .pixels()
        .zip(candidate.pixels())
        .filter(|(a, b)| a.iter().zip(*b).all(|(x, y)| x.abs_diff(*y) <= tolerance))
        .count();
    (similar as f64 / total as f64) as f32
}
