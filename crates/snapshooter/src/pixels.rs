use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::bitmap::Bitmap;

/// Bytes per pixel record (R, G, B, A).
pub const CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("bitmap has no decodable pixel data")]
    EmptyImage,

    #[error("failed to decode {width}x{height} pixel buffer: {reason}")]
    BufferDecodeFailure {
        width: u32,
        height: u32,
        reason: String,
    },
}

/// Interleaved 8-bit RGBA, alpha premultiplied, row-major from the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw premultiplied bytes. `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (buffer_len(width, height)? == data.len()).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Caller guarantees `data.len() == width * height * 4`.
    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(buffer_len(width, height), Some(data.len()));
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Iterate 4-byte pixel records.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(CHANNELS)
    }

    /// Convert back to straight (non-premultiplied) alpha for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let width = self.width as usize;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let i = (y as usize * width + x as usize) * CHANNELS;
            let px = &self.data[i..i + CHANNELS];
            Rgba(unpremultiply([px[0], px[1], px[2], px[3]]))
        })
    }
}

fn buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

fn premultiply(c: u8, a: u8) -> u8 {
    ((u32::from(c) * u32::from(a) + 127) / 255) as u8
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    match a {
        0 => [0, 0, 0, 0],
        255 => [r, g, b, a],
        _ => {
            let a32 = u32::from(a);
            let channel = |c: u8| ((u32::from(c) * 255 + a32 / 2) / a32).min(255) as u8;
            [channel(r), channel(g), channel(b), a]
        }
    }
}

/// Turns a [`Bitmap`] into a [`PixelBuffer`].
pub trait Decoder {
    fn decode(&self, bitmap: &Bitmap) -> Result<PixelBuffer, ExtractError>;
}

/// Software decoder: any source format is converted to 8-bit RGBA in the
/// device color space (no color management), then alpha is premultiplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct PremultipliedRgba;

impl Decoder for PremultipliedRgba {
    fn decode(&self, bitmap: &Bitmap) -> Result<PixelBuffer, ExtractError> {
        let image = bitmap.image().ok_or(ExtractError::EmptyImage)?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyImage);
        }
        let len = buffer_len(width, height).ok_or_else(|| ExtractError::BufferDecodeFailure {
            width,
            height,
            reason: "byte length overflows usize".to_string(),
        })?;

        let mut data = image.to_rgba8().into_raw();
        if data.len() != len {
            return Err(ExtractError::BufferDecodeFailure {
                width,
                height,
                reason: format!("expected {len} bytes, converter produced {}", data.len()),
            });
        }

        for px in data.chunks_exact_mut(CHANNELS) {
            let a = px[3];
            if a != 255 {
                for c in &mut px[..3] {
                    *c = premultiply(*c, a);
                }
            }
        }

        debug!(width, height, bytes = data.len(), "extracted pixel buffer");
        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }
}

/// Decode with the default [`PremultipliedRgba`] decoder.
pub fn extract_pixels(bitmap: &Bitmap) -> Result<PixelBuffer, ExtractError> {
    PremultipliedRgba.decode(bitmap)
}
