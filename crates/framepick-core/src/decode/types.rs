//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::orientation::Rotation;

/// Error kinds delivered by the decode pipeline.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The handle could not be opened for reading.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The decoder could not produce pixels for the source.
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// A pixel buffer could not be allocated.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// A target dimension resolved to zero, a negative or a non-finite value.
    #[error("Invalid target: {width}x{height}")]
    InvalidTarget { width: f32, height: f32 },

    /// An output adapter could not encode the decoded image.
    #[error("Encode failure: {0}")]
    EncodeFailure(String),
}

impl DecodeError {
    /// Map an `image` crate error raised while decoding pixels.
    pub(crate) fn from_image(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Limits(e) => DecodeError::AllocationFailure(e.to_string()),
            other => DecodeError::DecodeFailure(other.to_string()),
        }
    }
}

/// Filter type used when reducing a decoded image by its sample factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor (point sampling, closest to a decoder-side subsample).
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slowest, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl Orientation {
    /// Returns true for the four values that include a mirror.
    #[inline]
    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            Orientation::FlipHorizontal
                | Orientation::FlipVertical
                | Orientation::Transpose
                | Orientation::Transverse
        )
    }

    /// Clockwise rotation needed to display the image upright.
    ///
    /// Mirrored orientations cannot be expressed as a pure rotation and
    /// resolve to [`Rotation::Deg0`].
    pub fn rotation(self) -> Rotation {
        match self {
            Orientation::Rotate90CW => Rotation::Deg90,
            Orientation::Rotate180 => Rotation::Deg180,
            Orientation::Rotate270CW => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Natural (unsampled) pixel dimensions read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions after decoding at the given sample factor.
    ///
    /// Each axis is divided by the factor and never drops below one pixel.
    pub fn sampled(self, factor: SampleFactor) -> ImageBounds {
        let f = factor.get();
        ImageBounds {
            width: (self.width / f).max(1),
            height: (self.height / f).max(1),
        }
    }
}

/// Power-of-two downsample ratio applied at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleFactor(u32);

impl SampleFactor {
    /// Full resolution.
    pub const ONE: SampleFactor = SampleFactor(1);

    /// Build a factor, rejecting zero and values that are not powers of two.
    pub fn new(factor: u32) -> Option<Self> {
        factor.is_power_of_two().then_some(SampleFactor(factor))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// The next factor (twice this one), or `None` on overflow.
    pub(crate) fn doubled(self) -> Option<Self> {
        self.0.checked_mul(2).map(SampleFactor)
    }
}

impl Default for SampleFactor {
    fn default() -> Self {
        SampleFactor::ONE
    }
}

/// A decoded image with RGBA pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    /// Length should be width * height * 4.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * 4,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a DecodedImage from an image::RgbaImage.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// RGBA value at (x, y). Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_type_conversion() {
        assert!(matches!(
            FilterType::Nearest.to_image_filter(),
            image::imageops::FilterType::Nearest
        ));
        assert!(matches!(
            FilterType::Bilinear.to_image_filter(),
            image::imageops::FilterType::Triangle
        ));
        assert!(matches!(
            FilterType::Lanczos3.to_image_filter(),
            image::imageops::FilterType::Lanczos3
        ));
    }

    #[test]
    fn test_orientation_from_u32() {
        assert_eq!(Orientation::from(1), Orientation::Normal);
        assert_eq!(Orientation::from(6), Orientation::Rotate90CW);
        assert_eq!(Orientation::from(99), Orientation::Normal); // Invalid defaults to Normal
    }

    #[test]
    fn test_orientation_rotation_mapping() {
        assert_eq!(Orientation::Normal.rotation(), Rotation::Deg0);
        assert_eq!(Orientation::Rotate90CW.rotation(), Rotation::Deg90);
        assert_eq!(Orientation::Rotate180.rotation(), Rotation::Deg180);
        assert_eq!(Orientation::Rotate270CW.rotation(), Rotation::Deg270);
    }

    #[test]
    fn test_mirrored_orientations_fall_back_to_zero() {
        for o in [
            Orientation::FlipHorizontal,
            Orientation::FlipVertical,
            Orientation::Transpose,
            Orientation::Transverse,
        ] {
            assert!(o.is_mirrored());
            assert_eq!(o.rotation(), Rotation::Deg0, "{:?}", o);
        }
        assert!(!Orientation::Rotate90CW.is_mirrored());
    }

    #[test]
    fn test_sample_factor_rejects_non_powers() {
        assert!(SampleFactor::new(0).is_none());
        assert!(SampleFactor::new(3).is_none());
        assert_eq!(SampleFactor::new(8).map(SampleFactor::get), Some(8));
        assert_eq!(SampleFactor::default(), SampleFactor::ONE);
    }

    #[test]
    fn test_sampled_bounds() {
        let bounds = ImageBounds::new(4000, 3000);
        let sampled = bounds.sampled(SampleFactor::new(8).unwrap());
        assert_eq!(sampled, ImageBounds::new(500, 375));

        // Never below one pixel
        let thin = ImageBounds::new(4000, 3).sampled(SampleFactor::new(8).unwrap());
        assert_eq!(thin, ImageBounds::new(500, 1));
    }

    #[test]
    fn test_decoded_image_creation() {
        let pixels = vec![0u8; 100 * 50 * 4];
        let img = DecodedImage::new(100, 50, pixels);

        assert_eq!(img.width, 100);
        assert_eq!(img.height, 50);
        assert_eq!(img.pixels.len(), 20000);
        assert!(!img.is_empty());
    }

    #[test]
    fn test_decoded_image_empty() {
        let img = DecodedImage::new(0, 0, vec![]);
        assert!(img.is_empty());
    }

    #[test]
    fn test_decoded_image_from_rgba_image() {
        let mut buf = image::RgbaImage::new(2, 1);
        buf.put_pixel(1, 0, image::Rgba([1, 2, 3, 4]));
        let img = DecodedImage::from_rgba_image(buf);
        assert_eq!(img.pixel(1, 0), [1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::SourceUnavailable("photo.jpg".to_string());
        assert_eq!(err.to_string(), "Source unavailable: photo.jpg");

        let err = DecodeError::InvalidTarget {
            width: 0.0,
            height: 300.0,
        };
        assert_eq!(err.to_string(), "Invalid target: 0x300");
    }
}
