//! Geometry stages: the Transform Builder and the Compositor.
//!
//! # Transform Order
//!
//! The sampled image is mapped onto the destination canvas by one affine
//! transform built in this order:
//! 1. Translate the image center to the origin
//! 2. Rotate clockwise by the combined rotation
//! 3. Translate so the rotated bounds start at the origin
//! 4. Scale by the fit-mode factor
//! 5. Translate into the canvas (centering offset)
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, y points down
//! - Rotations are clockwise quarter turns
//! - 90 and 270 swap the canvas width and height

mod affine;
mod composite;
mod plan;

pub use affine::AffineTransform;
pub use composite::{allocate_canvas, render, InterpolationFilter};
pub use plan::{plan_render, FitMode, RenderPlan, TargetSpec};
