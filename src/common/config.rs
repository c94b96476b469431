//! # Configuration Utilities
//!
//! TOML configuration shared by the CLI and the batch runner. Every field has a
//! default, so a partial file (or none at all) is valid.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::processing::CodecOptions;

/// Read a TOML file and deserialize it into `T`.
///
/// Fails on I/O errors and on TOML that does not match `T`. Missing sections
/// are fine for [`StegoConfig`], whose fields all carry serde defaults.
///
/// # Example
/// ```ignore
/// let config: StegoConfig = load_config("config/stego.toml")?;
/// let codec = Codec::new(config.codec.options());
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Top-level configuration for the `stego` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    pub codec: CodecConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Codec settings. Embedder and extractor must agree on these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Hide bits in the alpha channel as well as the color channels.
    pub include_alpha: bool,
}

impl CodecConfig {
    pub fn options(&self) -> CodecOptions {
        CodecOptions {
            include_alpha: self.include_alpha,
        }
    }
}

/// Batch runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of images processed at the same time
    pub workers: usize,
    /// Maximum number of images accepted in one batch
    pub max_queue_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_queue_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `error`, `warn`, `info`, `debug`, `trace`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl StegoConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        load_config(path)
    }
}
