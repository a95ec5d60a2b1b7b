//! Sample-size selection and sampled decoding.
//!
//! Decoding a multi-megapixel photo at native resolution when the caller
//! asked for a few hundred pixels wastes memory. The selector picks the
//! largest power-of-two factor that still keeps both axes at or above the
//! requested size, and [`decode_sampled`] returns pixels at that reduced
//! resolution.
//!
//! # Algorithm
//!
//! ```text
//! factor = 1
//! while w/2 >= max_size and h/2 >= max_size:
//!     w, h, factor = w/2, h/2, factor*2
//! ```

use image::{ImageFormat, ImageReader, Limits};

use super::jpeg;
use super::source::{ImageProvider, ImageSource};
use super::{DecodeError, DecodedImage, FilterType, ImageBounds, SampleFactor};

/// Settings for [`decode_sampled`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOptions {
    /// Upper bound on bytes the decoder may allocate.
    pub max_decode_bytes: u64,
    /// Filter used to reduce the decoded image by the sample factor.
    pub filter: FilterType,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            max_decode_bytes: 512 * 1024 * 1024,
            filter: FilterType::Bilinear,
        }
    }
}

/// Choose the power-of-two downsample factor for `bounds`.
///
/// `max_size` is the larger of the two target dimensions. Halving stops the
/// first time a further halving would bring either axis below `max_size`.
/// A non-positive (or NaN) `max_size` performs no halving.
///
/// # Example
///
/// ```
/// use framepick_core::decode::{select_sample_factor, ImageBounds};
///
/// let factor = select_sample_factor(ImageBounds::new(4000, 3000), 300.0);
/// assert_eq!(factor.get(), 8);
/// ```
pub fn select_sample_factor(bounds: ImageBounds, max_size: f32) -> SampleFactor {
    let mut factor = SampleFactor::ONE;
    let max_size = max_size as f64;
    if !(max_size > 0.0) {
        return factor;
    }

    let mut width = bounds.width as f64;
    let mut height = bounds.height as f64;

    loop {
        let (half_w, half_h) = (width / 2.0, height / 2.0);
        // Sub-pixel targets would otherwise halve until the factor overflows
        if half_w < max_size || half_h < max_size || half_w.min(half_h) < 1.0 {
            break;
        }
        let Some(next) = factor.doubled() else {
            break;
        };
        width = half_w;
        height = half_h;
        factor = next;
    }

    factor
}

/// Decode `source` at `factor`.
///
/// JPEG sources are reduced inside the decoder, so the full-resolution
/// buffer never exists. Other formats are decoded in full, reduced in their
/// native color type and only then expanded to RGBA. The decoder's
/// allocations are capped at [`SampleOptions::max_decode_bytes`].
///
/// # Errors
///
/// - `DecodeError::SourceUnavailable` if the handle cannot be opened
/// - `DecodeError::AllocationFailure` if decoding would exceed the allocation cap
/// - `DecodeError::DecodeFailure` if the decoder produces no pixels
pub fn decode_sampled(
    provider: &dyn ImageProvider,
    source: &ImageSource,
    factor: SampleFactor,
    options: &SampleOptions,
) -> Result<DecodedImage, DecodeError> {
    let stream = provider
        .open(source.handle())
        .map_err(|e| DecodeError::SourceUnavailable(format!("{}: {}", source.handle(), e)))?;

    let mut reader = ImageReader::new(stream)
        .with_guessed_format()
        .map_err(|e| DecodeError::SourceUnavailable(format!("{}: {}", source.handle(), e)))?;

    if reader.format() == Some(ImageFormat::Jpeg) {
        return jpeg::decode_scaled(reader.into_inner(), source.handle(), factor, options);
    }

    let mut limits = Limits::default();
    limits.max_alloc = Some(options.max_decode_bytes);
    reader.limits(limits);

    let full = reader.decode().map_err(DecodeError::from_image)?;
    let (width, height) = (full.width(), full.height());
    if width == 0 || height == 0 {
        return Err(DecodeError::DecodeFailure(format!(
            "{}: decoder returned no pixels",
            source.handle()
        )));
    }

    if factor == SampleFactor::ONE {
        return Ok(DecodedImage::from_rgba_image(full.into_rgba8()));
    }

    let target = ImageBounds::new(width, height).sampled(factor);
    let reduced = full.resize_exact(
        target.width,
        target.height,
        options.filter.to_image_filter(),
    );
    drop(full);

    log::debug!(
        "sampled {} at 1/{}: {}x{} -> {}x{}",
        source.handle(),
        factor.get(),
        width,
        height,
        target.width,
        target.height
    );

    Ok(DecodedImage::from_rgba_image(reduced.into_rgba8()))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
