//! Image decoding stages for framepick.
//!
//! This module provides functionality for:
//! - Opening sources through an [`ImageProvider`]
//! - Probing natural dimensions from the header only
//! - Choosing a power-of-two sample factor and decoding at that factor
//! - Resolving the intrinsic orientation from EXIF or the content index
//!
//! # Memory Strategy
//!
//! Bounds are read before any pixel buffer exists, so the sample factor is
//! known before decoding starts. JPEG is scaled inside the decoder and never
//! materialises at full resolution. Other formats run under an allocation
//! cap and their full-resolution buffer is dropped as soon as the sampled
//! copy exists.
//!
//! # Examples
//!
//! ```ignore
//! use framepick_core::decode::{probe_bounds, select_sample_factor, FileProvider, ImageSource};
//!
//! let provider = FileProvider::new();
//! let source = ImageSource::camera("photo.jpg");
//! let bounds = probe_bounds(&provider, &source)?;
//! let factor = select_sample_factor(bounds, 300.0);
//! println!("{}x{} sampled at 1/{}", bounds.width, bounds.height, factor.get());
//! ```

mod bounds;
mod jpeg;
mod orientation;
mod sample;
mod source;
mod types;

pub use bounds::probe_bounds;
pub use orientation::{combined_rotation, read_exif_orientation, resolve_orientation, Rotation};
pub use sample::{decode_sampled, select_sample_factor, SampleOptions};
pub use source::{FileProvider, ImageProvider, ImageSource, MemoryProvider, Origin, ReadSeek};
pub use types::{DecodeError, DecodedImage, FilterType, ImageBounds, Orientation, SampleFactor};
