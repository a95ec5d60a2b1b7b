//! Runtime settings for the picker.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{FilterType, SampleOptions};
use crate::transform::InterpolationFilter;

/// Default allocation ceiling for the decoder (512 MiB).
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 512 * 1024 * 1024;

/// Default name of the background decode thread.
pub const DEFAULT_WORKER_NAME: &str = "framepick-decode";

/// Errors raised while loading a [`PickerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Upper bound on bytes the decoder may allocate for one image.
    pub max_decode_bytes: u64,
    /// Filter used when reducing by the sample factor.
    pub reduce_filter: FilterType,
    /// Sampler used by the compositor.
    pub interpolation: InterpolationFilter,
    /// Name given to the background decode thread.
    pub worker_name: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
            reduce_filter: FilterType::default(),
            interpolation: InterpolationFilter::default(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl PickerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PickerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_decode_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_decode_bytes must be greater than zero".to_string(),
            ));
        }
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "worker_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions {
            max_decode_bytes: self.max_decode_bytes,
            filter: self.reduce_filter,
        }
    }
}
