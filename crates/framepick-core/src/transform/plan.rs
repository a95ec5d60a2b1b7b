//! Target specification and render planning.
//!
//! [`plan_render`] turns the sampled image size, the combined rotation and
//! the caller's target into one [`AffineTransform`] plus the destination
//! canvas size.
//!
//! # Transform Order
//!
//! ```text
//! translate(-w/2, -h/2)      move the image center to the origin
//! rotate(r)                  clockwise quarter turn
//! translate(rw/2, rh/2)      back into positive space; (rw, rh) is the rotated size
//! scale(s, s)                fit-mode scale
//! translate(left, top)       center in the canvas
//! ```
//!
//! # Canvas
//!
//! For 90 and 270 the canvas is the target with width and height exchanged,
//! because the rotation exchanges the sampled image's axes.

use serde::{Deserialize, Serialize};

use super::AffineTransform;
use crate::decode::{DecodeError, ImageBounds, Rotation};

/// How the image is fitted into the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to fit entirely inside the target, letterboxing the rest.
    #[default]
    Contain,
    /// Scale to fill the target and center-crop the overflow.
    Exact,
}

/// Requested output box and fit policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub max_width: f32,
    pub max_height: f32,
    #[serde(default)]
    pub fit: FitMode,
}

impl TargetSpec {
    pub fn new(max_width: f32, max_height: f32, fit: FitMode) -> Self {
        Self {
            max_width,
            max_height,
            fit,
        }
    }

    pub fn contain(max_width: f32, max_height: f32) -> Self {
        Self::new(max_width, max_height, FitMode::Contain)
    }

    pub fn exact(max_width: f32, max_height: f32) -> Self {
        Self::new(max_width, max_height, FitMode::Exact)
    }

    /// The larger target dimension, used by the sample-size selector.
    pub fn max_size(&self) -> f32 {
        self.max_width.max(self.max_height)
    }

    /// Whole-pixel target dimensions.
    ///
    /// # Errors
    ///
    /// `DecodeError::InvalidTarget` if either dimension is below one pixel,
    /// negative or not finite.
    pub fn pixel_dimensions(&self) -> Result<(u32, u32), DecodeError> {
        let width = self.max_width.floor();
        let height = self.max_height.floor();
        if !(width >= 1.0 && height >= 1.0) || !width.is_finite() || !height.is_finite() {
            return Err(DecodeError::InvalidTarget {
                width: self.max_width,
                height: self.max_height,
            });
        }
        Ok((width as u32, height as u32))
    }
}

/// Everything the compositor needs to render one decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPlan {
    /// Maps sampled-image coordinates to canvas coordinates.
    pub transform: AffineTransform,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Uniform fit-mode scale.
    pub scale: f64,
    /// Final centering translation (left, top).
    pub offset: (f64, f64),
    pub rotation: Rotation,
}

impl RenderPlan {
    /// Size of the rendered content on the canvas, before clipping.
    pub fn content_size(&self, sampled: ImageBounds) -> (f64, f64) {
        let (rw, rh) = rotated_size(sampled, self.rotation);
        (rw * self.scale, rh * self.scale)
    }
}

fn rotated_size(sampled: ImageBounds, rotation: Rotation) -> (f64, f64) {
    let (w, h) = (sampled.width as f64, sampled.height as f64);
    if rotation.swaps_axes() {
        (h, w)
    } else {
        (w, h)
    }
}

/// Build the affine map and canvas size for a sampled image.
///
/// # Arguments
///
/// * `sampled` - Dimensions of the image as decoded at its sample factor
/// * `rotation` - Intrinsic orientation plus the user's rotation offset
/// * `target` - Requested box and fit mode
///
/// # Errors
///
/// Returns `DecodeError::InvalidTarget` if a target dimension resolves to
/// zero; no canvas should be allocated in that case.
pub fn plan_render(
    sampled: ImageBounds,
    rotation: Rotation,
    target: &TargetSpec,
) -> Result<RenderPlan, DecodeError> {
    let (target_w, target_h) = target.pixel_dimensions()?;
    if sampled.width == 0 || sampled.height == 0 {
        return Err(DecodeError::DecodeFailure(format!(
            "sampled image is {}x{}",
            sampled.width, sampled.height
        )));
    }

    let (canvas_width, canvas_height) = if rotation.swaps_axes() {
        (target_h, target_w)
    } else {
        (target_w, target_h)
    };

    let (w, h) = (sampled.width as f64, sampled.height as f64);
    let (rw, rh) = rotated_size(sampled, rotation);
    let (cw, ch) = (canvas_width as f64, canvas_height as f64);

    let scale = match target.fit {
        // Larger ratio: the image covers both axes and the excess is cropped
        FitMode::Exact => (cw / rw).max(ch / rh),
        // Smaller ratio: both axes stay inside the canvas
        FitMode::Contain => (cw / rw).min(ch / rh),
    };

    let left = (cw - scale * rw) / 2.0;
    let top = (ch - scale * rh) / 2.0;

    let transform = AffineTransform::translation(-w / 2.0, -h / 2.0)
        .then_rotate(rotation)
        .then_translate(rw / 2.0, rh / 2.0)
        .then_scale(scale, scale)
        .then_translate(left, top);

    log::debug!(
        "plan {}x{} rot {} {:?} -> canvas {}x{} scale {:.4} offset ({:.1}, {:.1})",
        sampled.width,
        sampled.height,
        rotation.degrees(),
        target.fit,
        canvas_width,
        canvas_height,
        scale,
        left,
        top
    );

    Ok(RenderPlan {
        transform,
        canvas_width,
        canvas_height,
        scale,
        offset: (left, top),
        rotation,
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn rotation_strategy() -> impl Strategy<Value = Rotation> {
        prop_oneof![
            Just(Rotation::Deg0),
            Just(Rotation::Deg90),
            Just(Rotation::Deg180),
            Just(Rotation::Deg270),
        ]
    }

    proptest! {
        /// Property: Contain content never exceeds the canvas, which is the
        /// target box (axis-exchanged for quarter turns).
        #[test]
        fn prop_contain_within_target(
            w in 1u32..=5000,
            h in 1u32..=5000,
            tw in 1u32..=2000,
            th in 1u32..=2000,
            rotation in rotation_strategy(),
        ) {
            let sampled = ImageBounds::new(w, h);
            let plan = plan_render(sampled, rotation, &TargetSpec::contain(tw as f32, th as f32)).unwrap();
            let (cw, ch) = plan.content_size(sampled);
            prop_assert!(cw <= plan.canvas_width as f64 + 1e-6);
            prop_assert!(ch <= plan.canvas_height as f64 + 1e-6);
            prop_assert!(plan.offset.0 >= -1e-6 && plan.offset.1 >= -1e-6);

            let expected = if rotation.swaps_axes() { (th, tw) } else { (tw, th) };
            prop_assert_eq!((plan.canvas_width, plan.canvas_height), expected);
        }

        /// Property: Exact content covers the whole canvas and the canvas is
        /// exactly the requested size.
        #[test]
        fn prop_exact_fills_target(
            w in 1u32..=5000,
            h in 1u32..=5000,
            tw in 1u32..=2000,
            th in 1u32..=2000,
            rotation in rotation_strategy(),
        ) {
            let sampled = ImageBounds::new(w, h);
            let plan = plan_render(sampled, rotation, &TargetSpec::exact(tw as f32, th as f32)).unwrap();
            let (cw, ch) = plan.content_size(sampled);
            prop_assert!(cw >= plan.canvas_width as f64 - 1e-6);
            prop_assert!(ch >= plan.canvas_height as f64 - 1e-6);
            prop_assert!(plan.offset.0 <= 1e-6 && plan.offset.1 <= 1e-6);

            let expected = if rotation.swaps_axes() { (th, tw) } else { (tw, th) };
            prop_assert_eq!((plan.canvas_width, plan.canvas_height), expected);
        }

        /// Property: the transform sends the source center to the canvas center.
        #[test]
        fn prop_center_maps_to_center(
            w in 1u32..=5000,
            h in 1u32..=5000,
            tw in 1u32..=2000,
            th in 1u32..=2000,
            rotation in rotation_strategy(),
            exact in any::<bool>(),
        ) {
            let fit = if exact { FitMode::Exact } else { FitMode::Contain };
            let plan = plan_render(
                ImageBounds::new(w, h),
                rotation,
                &TargetSpec::new(tw as f32, th as f32, fit),
            ).unwrap();
            let (x, y) = plan.transform.apply(w as f64 / 2.0, h as f64 / 2.0);
            prop_assert!((x - plan.canvas_width as f64 / 2.0).abs() < 1e-6);
            prop_assert!((y - plan.canvas_height as f64 / 2.0).abs() < 1e-6);
        }
    }
}
