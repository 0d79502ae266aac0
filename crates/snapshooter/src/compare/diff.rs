use image::Rgba;
use thiserror::Error;
use tracing::debug;

use super::{Precondition, Side, check_inputs};
use crate::bitmap::{Bitmap, Size};
use crate::composite::{BlendMode, Compositor, DrawOp, SoftwareCompositor};
use crate::pixels::{Decoder, ExtractError, PixelBuffer, PremultipliedRgba};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Opacity of the candidate layer over the reference.
const CANDIDATE_ALPHA: f32 = 0.5;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("images are different sizes: reference {reference}, candidate {candidate}")]
    SizeMismatch { reference: Size, candidate: Size },

    #[error("{side} image has no decodable pixel data")]
    EmptyImage { side: Side },

    #[error("failed to decode {side} pixel buffer: {reason}")]
    BufferDecodeFailure { side: Side, reason: String },
}

impl From<Precondition> for DiffError {
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

fn decode_side<D: Decoder>(
    decoder: &D,
    bitmap: &Bitmap,
    side: Side,
) -> Result<PixelBuffer, DiffError> {
    decoder.decode(bitmap).map_err(|e| match e {
        ExtractError::EmptyImage => DiffError::EmptyImage { side },
        ExtractError::BufferDecodeFailure { reason, .. } => {
            DiffError::BufferDecodeFailure { side, reason }
        }
    })
}

/// Renders an onion-skin difference image: the candidate is laid over the
/// reference at half opacity after being run through a difference blend with
/// white. Where the two agree the result is a flat mid-gray; changed pixels
/// stand out in color.
#[derive(Debug, Clone, Default)]
pub struct DifferenceRenderer<D = PremultipliedRgba, C = SoftwareCompositor> {
    decoder: D,
    compositor: C,
}

impl<D: Decoder, C: Compositor> DifferenceRenderer<D, C> {
    pub fn new(decoder: D, compositor: C) -> Self {
        Self {
            decoder,
            compositor,
        }
    }

    pub fn render(&self, reference: &Bitmap, candidate: &Bitmap) -> Result<Bitmap, DiffError> {
        check_inputs(reference, candidate)?;

        let reference_px = decode_side(&self.decoder, reference, Side::Reference)?;
        let candidate_px = decode_side(&self.decoder, candidate, Side::Candidate)?;

        let (width, height) = reference_px.dimensions();
        let ops = [
            DrawOp::DrawImage(&reference_px),
            DrawOp::SetAlpha(CANDIDATE_ALPHA),
            DrawOp::BeginTransparencyLayer,
            DrawOp::DrawImage(&candidate_px),
            DrawOp::SetBlendMode(BlendMode::Difference),
            DrawOp::Fill(WHITE),
            DrawOp::EndTransparencyLayer,
        ];
        let composited = self.compositor.composite(width, height, &ops);
        debug!(width, height, "rendered difference image");

        Ok(Bitmap::from_parts(
            composited.to_rgba_image(),
            reference.scale(),
        ))
    }
}

/// Difference image for two equal-size bitmaps, using the software
/// decoder and compositor.
pub fn highlight_difference(reference: &Bitmap, candidate: &Bitmap) -> Result<Bitmap, DiffError> {
    DifferenceRenderer::<PremultipliedRgba, SoftwareCompositor>::default()
        .render(reference, candidate)
}
