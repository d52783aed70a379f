//! Build and extraction settings
//!
//! Loaded from TOML; every field has a default, so an empty file is a
//! valid configuration.
//!
//! ```toml
//! [consolidator]
//! max_buffers = 10
//! max_vertices = 65536
//!
//! [build]
//! embed_buffers = true
//!
//! [extract]
//! best_effort = false
//! chunk_size = 4096
//! ```

use crate::error::{Result, XipError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Mesh buffer capacity limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatorConfig {
    /// Maximum number of shared mesh buffers per build
    pub max_buffers: usize,
    /// Maximum vertices per buffer; indices are u16, so at most 65536
    pub max_vertices: usize,
}

impl ConsolidatorConfig {
    pub const DEFAULT_MAX_BUFFERS: usize = 10;
    pub const DEFAULT_MAX_VERTICES: usize = 65536;

    pub fn new(max_buffers: usize, max_vertices: usize) -> Result<Self> {
        let config = Self {
            max_buffers,
            max_vertices,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Buffer index occupies the top 8 bits of a mesh key
        if self.max_buffers == 0 || self.max_buffers > 256 {
            return Err(XipError::Config(format!(
                "max_buffers must be in 1..=256, got {}",
                self.max_buffers
            )));
        }
        if self.max_vertices == 0 || self.max_vertices > u16::MAX as usize + 1 {
            return Err(XipError::Config(format!(
                "max_vertices must be in 1..=65536, got {}",
                self.max_vertices
            )));
        }
        Ok(())
    }
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            max_buffers: Self::DEFAULT_MAX_BUFFERS,
            max_vertices: Self::DEFAULT_MAX_VERTICES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Include generated index/vertex buffers in the same build pass
    pub embed_buffers: bool,
    /// Where `~<n>.ib` / `~<n>.vb` files are written; the source directory if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            embed_buffers: true,
            buffer_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Keep going past individual entry write failures
    pub best_effort: bool,
    /// Copy granularity for entry data
    pub chunk_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            best_effort: false,
            chunk_size: 4096,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XipConfig {
    pub consolidator: ConsolidatorConfig,
    pub build: BuildConfig,
    pub extract: ExtractOptions,
}

impl XipConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| XipError::at_path(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.consolidator.validate()?;
        if self.extract.chunk_size == 0 {
            return Err(XipError::Config("chunk_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
