//! Simulation configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for a seeded permutation run.
///
/// Missing TOML keys fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of permutations (default 10 000).
    pub iterations: usize,
    /// Retain every permuted statistic in iteration order.
    pub keep_distribution: bool,
    /// Master RNG seed.
    pub seed: u64,
    /// Worker threads. 1 runs on the calling thread.
    pub threads: usize,
    /// Iterations per RNG stream. Fixing this (not `threads`) fixes the output.
    pub chunk_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            keep_distribution: false,
            seed: 42,
            threads: 1,
            chunk_size: 1_000,
        }
    }
}

impl SimulationConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Number of RNG chunks the iterations split into.
    pub fn chunk_count(&self) -> usize {
        self.iterations.div_ceil(self.chunk_size.max(1))
    }
}
