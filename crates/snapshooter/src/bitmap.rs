use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("display scale must be positive and finite, got {0}")]
    InvalidScale(f32),

    #[error("placeholder bitmap has no pixel data to encode")]
    Placeholder,

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Logical size of a bitmap, in points (pixels divided by display scale).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An immutable decoded raster plus the display scale it was rendered at.
///
/// A bitmap may also be a placeholder with no pixel data at all, which is
/// what an unrendered surface hands back. Placeholders have a zero size and
/// are rejected by every comparison.
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: Option<DynamicImage>,
    scale: f32,
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::placeholder()
    }
}

fn validate_scale(scale: f32) -> Result<f32, BitmapError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err(BitmapError::InvalidScale(scale))
    }
}

impl Bitmap {
    pub fn new(image: DynamicImage, scale: f32) -> Result<Self, BitmapError> {
        let scale = validate_scale(scale)?;
        Ok(Self {
            image: Some(image),
            scale,
        })
    }

    pub fn from_rgba(image: RgbaImage, scale: f32) -> Result<Self, BitmapError> {
        Self::new(DynamicImage::ImageRgba8(image), scale)
    }

    /// A bitmap without any pixel data.
    pub fn placeholder() -> Self {
        Self {
            image: None,
            scale: 1.0,
        }
    }

    /// Decode an encoded image (PNG or any format the `image` crate sniffs).
    pub fn from_encoded(bytes: &[u8], scale: f32) -> Result<Self, BitmapError> {
        let scale = validate_scale(scale)?;
        let image = image::load_from_memory(bytes)?;
        Ok(Self {
            image: Some(image),
            scale,
        })
    }

    pub fn open(path: &Path, scale: f32) -> Result<Self, BitmapError> {
        let bytes = std::fs::read(path).map_err(|source| BitmapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_encoded(&bytes, scale)
    }

    /// Used for freshly composited output whose scale was already validated.
    pub(crate) fn from_parts(image: RgbaImage, scale: f32) -> Self {
        Self {
            image: Some(DynamicImage::ImageRgba8(image)),
            scale,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.image.is_none()
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Physical pixel dimensions. `(0, 0)` for a placeholder.
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        self.image
            .as_ref()
            .map_or((0, 0), |img| (img.width(), img.height()))
    }

    /// Logical size: pixel dimensions divided by the display scale.
    pub fn size(&self) -> Size {
        let (w, h) = self.pixel_dimensions();
        let scale = f64::from(self.scale);
        Size {
            width: f64::from(w) / scale,
            height: f64::from(h) / scale,
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>, BitmapError> {
        let image = self.image.as_ref().ok_or(BitmapError::Placeholder)?;
        let mut buf = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn logical_size_divides_by_scale() {
        let img = RgbaImage::from_pixel(30, 60, Rgba([0, 0, 0, 255]));
        let bitmap = Bitmap::from_rgba(img, 3.0).unwrap();
        assert_eq!(bitmap.pixel_dimensions(), (30, 60));
        assert_eq!(
            bitmap.size(),
            Size {
                width: 10.0,
                height: 20.0
            }
        );
        assert_eq!(bitmap.size().to_string(), "10x20");
    }

    #[test]
    fn placeholder_has_zero_size() {
        let bitmap = Bitmap::default();
        assert!(bitmap.is_placeholder());
        assert_eq!(bitmap.size(), Size::ZERO);
        assert!(matches!(bitmap.to_png(), Err(BitmapError::Placeholder)));
    }

    #[test]
    fn rejects_non_positive_scale() {
        let img = RgbaImage::new(1, 1);
        assert!(matches!(
            Bitmap::from_rgba(img.clone(), 0.0),
            Err(BitmapError::InvalidScale(_))
        ));
        assert!(matches!(
            Bitmap::from_rgba(img, f32::NAN),
            Err(BitmapError::InvalidScale(_))
        ));
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        let img = RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255]));
        let bitmap = Bitmap::from_rgba(img.clone(), 2.0).unwrap();
        let png = bitmap.to_png().unwrap();
        let decoded = Bitmap::from_encoded(&png, 2.0).unwrap();
        assert_eq!(decoded.image().unwrap().to_rgba8(), img);
        assert_eq!(decoded.size(), bitmap.size());
    }

    #[test]
    fn open_reports_missing_file() {
        let err = Bitmap::open(Path::new("/definitely/not/here.png"), 1.0).unwrap_err();
        assert!(matches!(err, BitmapError::Io { .. }));
    }
}
