//! Configuration for the write engine model.
//!
//! The buffer layout, FIFO depth and burst bound are fixed at construction
//! time; this module only decides what those construction-time values are.
//! Values are loaded in priority order:
//!
//! 1. Environment variables (`RINGBURST_*`)
//! 2. Project-local config file (`./ringburst.toml`)
//! 3. User config file (`~/.config/ringburst/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # ringburst.toml
//! buffer_base = 0x1000_0000
//! buffer_count = 3
//! buffer_size = 4096
//! fifo_depth = 32
//! max_burst_length = 16
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::writer::{RingLayout, DATA_WIDTH_BYTES, MAX_BURST_LIMIT};

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("buffer_count must be at least 1")]
    ZeroBuffers,

    #[error("fifo_depth must be at least 1")]
    ZeroFifoDepth,

    #[error("max_burst_length {got} outside 1..={limit}")]
    BadBurstLength { got: usize, limit: usize },

    #[error("buffer_size {size} must exceed twice the max burst span ({required} bytes)")]
    BufferTooSmall { size: u64, required: u64 },

    #[error("{field} {value:#x} must be a multiple of the {width}-byte word width")]
    Misaligned {
        field: &'static str,
        value: u64,
        width: usize,
    },
}

/// Engine construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Base address of buffer 0; buffers are laid out back to back.
    pub buffer_base: u64,
    /// Number of ring buffers.
    pub buffer_count: usize,
    /// Size of each buffer in bytes.
    pub buffer_size: u64,
    /// Depth bound of the elastic input buffer, in words.
    pub fifo_depth: usize,
    /// Upper bound on the beats of a single burst.
    pub max_burst_length: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            buffer_base: 0x1000_0000,
            buffer_count: 3,
            buffer_size: 4096,
            fifo_depth: 32,
            max_burst_length: 16,
        }
    }
}

impl WriterConfig {
    /// Load configuration from all sources, highest priority last applied.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user) = Self::load_user_config() {
            config = user;
        }
        if let Some(local) = Self::load_from_file(Path::new("ringburst.toml")) {
            config = local;
        }
        config.apply_env_overrides();

        config
    }

    /// Byte span of a maximum-length burst.
    pub fn max_burst_bytes(&self) -> u64 {
        (self.max_burst_length * DATA_WIDTH_BYTES) as u64
    }

    /// Check every structural invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_count == 0 {
            return Err(ConfigError::ZeroBuffers);
        }
        if self.fifo_depth == 0 {
            return Err(ConfigError::ZeroFifoDepth);
        }
        if self.max_burst_length == 0 || self.max_burst_length > MAX_BURST_LIMIT {
            return Err(ConfigError::BadBurstLength {
                got: self.max_burst_length,
                limit: MAX_BURST_LIMIT,
            });
        }
        if self.buffer_base % DATA_WIDTH_BYTES as u64 != 0 {
            return Err(ConfigError::Misaligned {
                field: "buffer_base",
                value: self.buffer_base,
                width: DATA_WIDTH_BYTES,
            });
        }
        if self.buffer_size % DATA_WIDTH_BYTES as u64 != 0 {
            return Err(ConfigError::Misaligned {
                field: "buffer_size",
                value: self.buffer_size,
                width: DATA_WIDTH_BYTES,
            });
        }
        // A buffer the margin would swallow could never produce an address.
        let required = 2 * self.max_burst_bytes();
        if self.buffer_size <= required {
            return Err(ConfigError::BufferTooSmall {
                size: self.buffer_size,
                required,
            });
        }
        Ok(())
    }

    /// Validate and build the ring layout the engine is constructed over.
    pub fn ring_layout(&self) -> Result<RingLayout, ConfigError> {
        self.validate()?;
        Ok(RingLayout::contiguous(
            self.buffer_base,
            self.buffer_count,
            self.buffer_size,
        ))
    }

    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let path = config_dir.join("ringburst").join("config.toml");
        Self::load_from_file(&path)
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u64("RINGBURST_BUFFER_BASE") {
            self.buffer_base = v;
        }
        if let Some(v) = env_u64("RINGBURST_BUFFER_COUNT") {
            self.buffer_count = v as usize;
        }
        if let Some(v) = env_u64("RINGBURST_BUFFER_SIZE") {
            self.buffer_size = v;
        }
        if let Some(v) = env_u64("RINGBURST_FIFO_DEPTH") {
            self.fifo_depth = v as usize;
        }
        if let Some(v) = env_u64("RINGBURST_MAX_BURST_LENGTH") {
            self.max_burst_length = v as usize;
        }
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# ringburst configuration
# Place this file at ~/.config/ringburst/config.toml or ./ringburst.toml

# Base address of ring buffer 0 (buffers are contiguous above it)
buffer_base = 0x10000000

# Ring buffer layout
buffer_count = 3
buffer_size = 4096

# Elastic input buffer depth, in words
fifo_depth = 32

# Upper bound on burst length, in beats
max_burst_length = 16
"#
        .to_string()
    }
}

/// Parse a decimal or `0x` hex integer from the environment.
fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    let parsed = if let Some(hex) = raw.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        raw.parse()
    };
    match parsed {
        Ok(v) => {
            log::info!("Using {} from environment: {}", name, v);
            Some(v)
        }
        Err(_) => {
            log::warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}
