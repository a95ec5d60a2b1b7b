//! The synchronous decode pipeline.
//!
//! Runs every stage for one request, in order: bounds probe, sample-size
//! selection, sampled decode, orientation resolution, transform build and
//! compositing. This is the unit of work the coordinator moves off the
//! foreground context.

use std::time::Instant;

use crate::config::PickerConfig;
use crate::decode::{
    combined_rotation, decode_sampled, probe_bounds, select_sample_factor, DecodeError,
    DecodedImage, ImageBounds, ImageProvider, ImageSource, Rotation,
};
use crate::transform::{plan_render, render, TargetSpec};

/// Decode `source` into a canvas fitted to `target`.
///
/// `rotation_offset` is the user's accumulated rotation; it is added to the
/// orientation stored with the image.
///
/// # Errors
///
/// - `DecodeError::InvalidTarget` before any I/O if the target has a zero dimension
/// - `DecodeError::SourceUnavailable` if the handle cannot be opened
/// - `DecodeError::DecodeFailure` if the data is not a decodable image
/// - `DecodeError::AllocationFailure` if a buffer cannot be obtained
pub fn decode(
    provider: &dyn ImageProvider,
    source: &ImageSource,
    target: &TargetSpec,
    rotation_offset: Rotation,
    config: &PickerConfig,
) -> Result<DecodedImage, DecodeError> {
    let started = Instant::now();
    target.pixel_dimensions()?;

    let bounds = probe_bounds(provider, source)?;
    let factor = select_sample_factor(bounds, target.max_size());
    log::debug!(
        "{}: {}x{} sample factor {}",
        source.handle(),
        bounds.width,
        bounds.height,
        factor.get()
    );

    let sampled = decode_sampled(provider, source, factor, &config.sample_options())?;
    let rotation = combined_rotation(provider, source, rotation_offset);
    let plan = plan_render(
        ImageBounds::new(sampled.width, sampled.height),
        rotation,
        target,
    )?;

    let output = render(sampled, &plan, config.interpolation)?;

    log::info!(
        "decoded {} ({}x{}, 1/{}, {} deg) -> {}x{} in {:?}",
        source.handle(),
        bounds.width,
        bounds.height,
        factor.get(),
        rotation.degrees(),
        output.width,
        output.height,
        started.elapsed()
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::MemoryProvider;
    use crate::fixtures;
    use std::sync::OnceLock;

    /// 4000x3000 PNG, encoded once for the whole module.
    fn large_png() -> &'static [u8] {
        static BYTES: OnceLock<Vec<u8>> = OnceLock::new();
        BYTES.get_or_init(|| fixtures::split_png_bytes(4000, 3000))
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new()
            .with_image("large.png", large_png().to_vec())
            .with_image("large-gallery.png", large_png().to_vec())
            .with_orientation("large-gallery.png", 90)
    }

    #[test]
    fn test_exact_square_from_large_image() {
        let out = decode(
            &provider(),
            &ImageSource::camera("large.png"),
            &TargetSpec::exact(300.0, 300.0),
            Rotation::Deg0,
            &PickerConfig::default(),
        )
        .unwrap();

        assert_eq!((out.width, out.height), (300, 300));
        // Exact leaves no transparent padding
        assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(out.pixel(299, 299), [0, 0, 255, 255]);
    }

    #[test]
    fn test_intrinsic_quarter_turn_swaps_canvas() {
        let target = TargetSpec::contain(400.0, 300.0);
        let config = PickerConfig::default();
        let p = provider();

        let upright = decode(
            &p,
            &ImageSource::gallery("large.png"),
            &target,
            Rotation::Deg0,
            &config,
        )
        .unwrap();
        let turned = decode(
            &p,
            &ImageSource::gallery("large-gallery.png"),
            &target,
            Rotation::Deg0,
            &config,
        )
        .unwrap();

        assert_eq!((upright.width, upright.height), (400, 300));
        assert_eq!((turned.width, turned.height), (300, 400));
        // Left (red) edge of the source is now at the top
        assert_eq!(turned.pixel(150, 20), [255, 0, 0, 255]);
        assert_eq!(turned.pixel(150, 380), [0, 0, 255, 255]);
    }

    #[test]
    fn test_offset_adds_to_exif_orientation() {
        let provider = MemoryProvider::new()
            .with_image("cam.jpg", fixtures::jpeg_with_orientation(64, 32, 6));
        let out = decode(
            &provider,
            &ImageSource::camera("cam.jpg"),
            &TargetSpec::contain(64.0, 32.0),
            Rotation::Deg270,
            &PickerConfig::default(),
        )
        .unwrap();
        // 90 + 270 = 0, so the canvas is not swapped
        assert_eq!((out.width, out.height), (64, 32));
    }

    #[test]
    fn test_gallery_without_attribute_still_decodes() {
        let provider =
            MemoryProvider::new().with_image("g.jpg", fixtures::jpeg_bytes(120, 80));
        let out = decode(
            &provider,
            &ImageSource::gallery("g.jpg"),
            &TargetSpec::exact(60.0, 60.0),
            Rotation::Deg0,
            &PickerConfig::default(),
        )
        .unwrap();
        assert_eq!((out.width, out.height), (60, 60));
    }

    #[test]
    fn test_invalid_target_fails_before_io() {
        // The handle does not exist; the target check must come first
        let err = decode(
            &MemoryProvider::new(),
            &ImageSource::camera("missing"),
            &TargetSpec::exact(0.0, 100.0),
            Rotation::Deg0,
            &PickerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTarget { .. }));
    }

    #[test]
    fn test_missing_source() {
        let err = decode(
            &MemoryProvider::new(),
            &ImageSource::camera("missing"),
            &TargetSpec::exact(10.0, 10.0),
            Rotation::Deg0,
            &PickerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::SourceUnavailable(_)));
    }

    #[test]
    fn test_corrupt_data() {
        let provider = MemoryProvider::new().with_image("bad", b"not an image".to_vec());
        let err = decode(
            &provider,
            &ImageSource::camera("bad"),
            &TargetSpec::exact(10.0, 10.0),
            Rotation::Deg0,
            &PickerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::DecodeFailure(_)));
    }

    #[test]
    fn test_decoder_budget_is_allocation_failure() {
        let provider = MemoryProvider::new().with_image("p.png", fixtures::png_bytes(256, 256));
        let config = PickerConfig {
            max_decode_bytes: 1024,
            ..Default::default()
        };
        let err = decode(
            &provider,
            &ImageSource::camera("p.png"),
            &TargetSpec::exact(64.0, 64.0),
            Rotation::Deg0,
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::AllocationFailure(_)));
    }
}
