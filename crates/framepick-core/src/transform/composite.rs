//! Rendering a sampled image through a [`RenderPlan`].
//!
//! The compositor uses inverse mapping: for each pixel center in the
//! destination canvas, the inverse transform gives the source position to
//! sample. Destination pixels that map outside the source stay fully
//! transparent, which is what produces the letterbox in Contain mode.

use serde::{Deserialize, Serialize};

use super::RenderPlan;
use crate::decode::{DecodeError, DecodedImage};

/// Sampler used when painting through the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationFilter {
    /// Nearest source pixel.
    Nearest,
    /// Weighted average of the four nearest pixels.
    #[default]
    Bilinear,
}

/// Allocate a zeroed (transparent) RGBA canvas.
///
/// # Errors
///
/// `DecodeError::AllocationFailure` if the size overflows or the allocator
/// refuses the request.
pub fn allocate_canvas(width: u32, height: u32) -> Result<Vec<u8>, DecodeError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            DecodeError::AllocationFailure(format!("canvas {}x{} overflows", width, height))
        })?;

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        DecodeError::AllocationFailure(format!("canvas {}x{}: {}", width, height, e))
    })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Paint `sampled` onto a new canvas described by `plan`.
///
/// Takes ownership of the sampled image so its buffer is released as soon
/// as rendering finishes.
pub fn render(
    sampled: DecodedImage,
    plan: &RenderPlan,
    filter: InterpolationFilter,
) -> Result<DecodedImage, DecodeError> {
    if sampled.is_empty() {
        return Err(DecodeError::DecodeFailure(
            "sampled image has no pixels".to_string(),
        ));
    }

    let inverse = plan.transform.invert().ok_or_else(|| {
        DecodeError::DecodeFailure(format!("singular transform (scale {})", plan.scale))
    })?;

    let (dst_w, dst_h) = (plan.canvas_width, plan.canvas_height);
    let mut output = allocate_canvas(dst_w, dst_h)?;

    let src_w = sampled.width as f64;
    let src_h = sampled.height as f64;

    for dst_y in 0..dst_h {
        for dst_x in 0..dst_w {
            let (src_x, src_y) = inverse.apply(dst_x as f64 + 0.5, dst_y as f64 + 0.5);

            if src_x < 0.0 || src_y < 0.0 || src_x >= src_w || src_y >= src_h {
                continue;
            }

            let pixel = match filter {
                InterpolationFilter::Nearest => sample_nearest(&sampled, src_x, src_y),
                // Shift to pixel-center coordinates for interpolation
                InterpolationFilter::Bilinear => sample_bilinear(&sampled, src_x - 0.5, src_y - 0.5),
            };

            let idx = (dst_y as usize * dst_w as usize + dst_x as usize) * 4;
            output[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    drop(sampled);
    Ok(DecodedImage::new(dst_w, dst_h, output))
}

#[inline]
fn sample_nearest(image: &DecodedImage, x: f64, y: f64) -> [u8; 4] {
    let px = (x as u32).min(image.width - 1);
    let py = (y as u32).min(image.height - 1);
    image.pixel(px, py)
}

/// Bilinear interpolation over the 4 nearest pixels.
///
/// Coordinates are clamped to the image so edge pixels are extended rather
/// than blended with black.
fn sample_bilinear(image: &DecodedImage, x: f64, y: f64) -> [u8; 4] {
    let max_x = (image.width - 1) as f64;
    let max_y = (image.height - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(image.width - 1);
    let y1 = (y0 + 1).min(image.height - 1);

    // Fractional distances
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.pixel(x0, y0);
    let p10 = image.pixel(x1, y0);
    let p01 = image.pixel(x0, y1);
    let p11 = image.pixel(x1, y1);

    let mut result = [0u8; 4];
    for i in 0..4 {
        let v = p00[i] as f64 * (1.0 - fx) * (1.0 - fy)
            + p10[i] as f64 * fx * (1.0 - fy)
            + p01[i] as f64 * (1.0 - fx) * fy
            + p11[i] as f64 * fx * fy;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }

    result
}
