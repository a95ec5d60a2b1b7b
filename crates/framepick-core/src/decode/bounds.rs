//! Header-only dimension probing.

use image::ImageReader;

use super::source::{ImageProvider, ImageSource};
use super::{DecodeError, ImageBounds};

/// Read the natural dimensions of `source` without decoding pixel data.
///
/// Only the header is parsed; no pixel buffer is allocated. One read stream
/// is opened and dropped before returning.
///
/// # Errors
///
/// - `DecodeError::SourceUnavailable` if the handle cannot be opened or read
/// - `DecodeError::DecodeFailure` if the header is not a recognised image or
///   reports a zero dimension
pub fn probe_bounds(
    provider: &dyn ImageProvider,
    source: &ImageSource,
) -> Result<ImageBounds, DecodeError> {
    let stream = provider
        .open(source.handle())
        .map_err(|e| DecodeError::SourceUnavailable(format!("{}: {}", source.handle(), e)))?;

    let reader = ImageReader::new(stream)
        .with_guessed_format()
        .map_err(|e| DecodeError::SourceUnavailable(format!("{}: {}", source.handle(), e)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| DecodeError::DecodeFailure(format!("{}: {}", source.handle(), e)))?;

    if width == 0 || height == 0 {
        return Err(DecodeError::DecodeFailure(format!(
            "{}: header reports {}x{}",
            source.handle(),
            width,
            height
        )));
    }

    log::debug!("probed {} -> {}x{}", source.handle(), width, height);
    Ok(ImageBounds::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::source::MemoryProvider;
    use crate::fixtures;

    #[test]
    fn test_probe_png_bounds() {
        let provider = MemoryProvider::new().with_image("a.png", fixtures::png_bytes(40, 30));
        let bounds = probe_bounds(&provider, &ImageSource::camera("a.png")).unwrap();
        assert_eq!(bounds, ImageBounds::new(40, 30));
    }

    #[test]
    fn test_probe_jpeg_bounds() {
        let provider = MemoryProvider::new().with_image("a.jpg", fixtures::jpeg_bytes(64, 16));
        let bounds = probe_bounds(&provider, &ImageSource::gallery("a.jpg")).unwrap();
        assert_eq!(bounds, ImageBounds::new(64, 16));
    }

    #[test]
    fn test_probe_missing_source() {
        let provider = MemoryProvider::new();
        let result = probe_bounds(&provider, &ImageSource::camera("nope"));
        assert!(matches!(result, Err(DecodeError::SourceUnavailable(_))));
    }

    #[test]
    fn test_probe_garbage_bytes() {
        let provider = MemoryProvider::new().with_image("junk", vec![0x00, 0x01, 0x02, 0x03]);
        let result = probe_bounds(&provider, &ImageSource::camera("junk"));
        assert!(matches!(result, Err(DecodeError::DecodeFailure(_))));
    }

    #[test]
    fn test_probe_truncated_header() {
        let png = fixtures::png_bytes(10, 10);
        let provider = MemoryProvider::new().with_image("cut", png[..12].to_vec());
        let result = probe_bounds(&provider, &ImageSource::camera("cut"));
        assert!(result.is_err());
    }
}
