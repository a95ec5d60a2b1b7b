//! Result delivery and output adapters.
//!
//! The decode pipeline always produces a [`DecodedImage`]. An
//! [`OutputAdapter`] turns that into whatever the host consumes, and a
//! [`Delivery`] receives it on the worker context once the decode finishes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::decode::{DecodeError, DecodedImage, ImageSource};
use crate::encode::encode_png;

/// Receives exactly one result per accepted request.
///
/// Implemented for any `Fn(&ImageSource, Result<T, DecodeError>)` closure.
pub trait Delivery<T>: Send + Sync {
    fn deliver(&self, source: &ImageSource, result: Result<T, DecodeError>);
}

impl<T, F> Delivery<T> for F
where
    F: Fn(&ImageSource, Result<T, DecodeError>) + Send + Sync,
{
    fn deliver(&self, source: &ImageSource, result: Result<T, DecodeError>) {
        self(source, result)
    }
}

/// Converts a rendered image into the form handed to the host.
pub trait OutputAdapter: Send + Sync + 'static {
    type Output: Send + 'static;

    fn adapt(&self, image: DecodedImage) -> Result<Self::Output, DecodeError>;
}

/// Hands the RGBA buffer over unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPixels;

impl OutputAdapter for RawPixels {
    type Output = DecodedImage;

    fn adapt(&self, image: DecodedImage) -> Result<DecodedImage, DecodeError> {
        Ok(image)
    }
}

/// PNG-encodes the image and returns it as standard base64 without line
/// breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Png;

impl OutputAdapter for Base64Png {
    type Output = String;

    fn adapt(&self, image: DecodedImage) -> Result<String, DecodeError> {
        let png = encode_png(&image).map_err(|e| DecodeError::EncodeFailure(e.to_string()))?;
        drop(image);
        Ok(BASE64.encode(png))
    }
}
