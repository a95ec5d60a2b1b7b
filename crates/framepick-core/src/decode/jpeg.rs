//! JPEG decoding at a reduced scale.
//!
//! The JPEG decoder can shrink the image inside the inverse DCT by 1/2, 1/4
//! or 1/8, so pixels are produced at the sampled size directly. Factors above
//! 8 decode at 1/8 and finish with a resize of the already small image.

use std::io::Read;

use image::{imageops, RgbaImage};
use jpeg_decoder::{Decoder, PixelFormat};

use super::sample::SampleOptions;
use super::{DecodeError, DecodedImage, ImageBounds, SampleFactor};

/// Largest reduction the decoder performs by itself.
const MAX_DCT_FACTOR: u32 = 8;

/// Decode a JPEG stream at `factor`.
///
/// The budget covers the scaled decoder output plus its RGBA copy and is
/// checked against the scaled size before any pixel is decoded.
pub(crate) fn decode_scaled<R: Read>(
    reader: R,
    handle: &str,
    factor: SampleFactor,
    options: &SampleOptions,
) -> Result<DecodedImage, DecodeError> {
    let mut decoder = Decoder::new(reader);
    decoder.read_info().map_err(|e| failure(handle, e))?;

    let info = decoder
        .info()
        .ok_or_else(|| DecodeError::DecodeFailure(format!("{}: missing JPEG header", handle)))?;
    if info.width == 0 || info.height == 0 {
        return Err(DecodeError::DecodeFailure(format!(
            "{}: header reports {}x{}",
            handle, info.width, info.height
        )));
    }

    let target = ImageBounds::new(info.width as u32, info.height as u32).sampled(factor);
    let dct = factor.get().min(MAX_DCT_FACTOR);
    let (width, height) = decoder
        .scale(
            (info.width as u32).div_ceil(dct) as u16,
            (info.height as u32).div_ceil(dct) as u16,
        )
        .map_err(|e| failure(handle, e))?;
    let (width, height) = (width as u32, height as u32);

    let bytes_per_pixel = info.pixel_format.pixel_bytes() as u64;
    let needed = width as u64 * height as u64 * (bytes_per_pixel + 4);
    if needed > options.max_decode_bytes {
        return Err(DecodeError::AllocationFailure(format!(
            "{}: {}x{} needs {} bytes, limit is {}",
            handle, width, height, needed, options.max_decode_bytes
        )));
    }

    let raw = decoder.decode().map_err(|e| failure(handle, e))?;
    let rgba = to_rgba(&raw, width, height, info.pixel_format, handle)?;
    drop(raw);

    log::debug!(
        "jpeg {} at 1/{}: {}x{} decoded as {}x{}",
        handle,
        factor.get(),
        info.width,
        info.height,
        width,
        height
    );

    if (width, height) == (target.width, target.height) {
        return Ok(DecodedImage::from_rgba_image(rgba));
    }

    let reduced = imageops::resize(
        &rgba,
        target.width,
        target.height,
        options.filter.to_image_filter(),
    );
    Ok(DecodedImage::from_rgba_image(reduced))
}

fn failure(handle: &str, err: jpeg_decoder::Error) -> DecodeError {
    DecodeError::DecodeFailure(format!("{}: {}", handle, err))
}

/// Expand decoder output to RGBA.
fn to_rgba(
    raw: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    handle: &str,
) -> Result<RgbaImage, DecodeError> {
    let len = width as usize * height as usize * 4;
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|e| {
        DecodeError::AllocationFailure(format!("{}: {}x{}: {}", handle, width, height, e))
    })?;

    match format {
        PixelFormat::L8 => {
            for &l in raw {
                out.extend_from_slice(&[l, l, l, 255]);
            }
        }
        PixelFormat::L16 => {
            // Big-endian samples, keep the high byte
            for px in raw.chunks_exact(2) {
                out.extend_from_slice(&[px[0], px[0], px[0], 255]);
            }
        }
        PixelFormat::RGB24 => {
            for px in raw.chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        PixelFormat::CMYK32 => {
            for px in raw.chunks_exact(4) {
                let k = 255 - px[3] as u32;
                let channel = |v: u8| ((255 - v as u32) * k / 255) as u8;
                out.extend_from_slice(&[channel(px[0]), channel(px[1]), channel(px[2]), 255]);
            }
        }
    }

    let produced = out.len();
    RgbaImage::from_raw(width, height, out).ok_or_else(|| {
        DecodeError::DecodeFailure(format!(
            "{}: decoder returned {} RGBA bytes for {}x{}",
            handle, produced, width, height
        ))
    })
}
