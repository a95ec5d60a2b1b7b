//! Framepick Core - bounded-memory image loading
//!
//! This crate turns a picked image (a camera capture or a gallery entry) into
//! a pixel buffer fitted to a requested box. It reads the natural bounds
//! first, decodes at a power-of-two sample factor, applies the stored
//! orientation plus the user's rotation, and composites the result onto the
//! destination canvas. Decodes run in the background, one at a time.

pub mod config;
pub mod coordinator;
pub mod decode;
pub mod encode;
pub mod output;
pub mod picker;
pub mod pipeline;
pub mod transform;

#[cfg(test)]
mod fixtures;

pub use config::{ConfigError, PickerConfig};
pub use coordinator::{Coordinator, Executor, RunState, SubmitError, ThreadExecutor};
#[cfg(feature = "tokio")]
pub use coordinator::TokioExecutor;
pub use decode::{
    DecodeError, DecodedImage, FileProvider, ImageBounds, ImageProvider, ImageSource,
    MemoryProvider, Origin, Rotation, SampleFactor,
};
pub use output::{Base64Png, Delivery, OutputAdapter, RawPixels};
pub use picker::{ImagePicker, PickerState};
pub use pipeline::decode as decode_image;
pub use transform::{FitMode, InterpolationFilter, TargetSpec};
