//! Image encoding for framepick outputs.
//!
//! This module provides functionality for:
//! - Encoding rendered RGBA images to PNG, the lossless format the text
//!   output adapter wraps in base64
//!
//! # Examples
//!
//! ```ignore
//! use framepick_core::encode::encode_png;
//!
//! let png = encode_png(&rendered)?;
//! println!("Encoded {} bytes", png.len());
//! ```

mod png;

pub use png::{encode_png, EncodeError};
