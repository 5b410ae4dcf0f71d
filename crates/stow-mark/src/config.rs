use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MarkError, MarkResult};

/// Tuning for a reachability walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkConfig {
    /// Maximum number of trees loaded at once. Zero is treated as one.
    pub concurrency: usize,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

impl MarkConfig {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self { concurrency }
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Top-level configuration file.
///
/// ```toml
/// [mark]
/// concurrency = 16
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowConfig {
    pub mark: MarkConfig,
}

impl StowConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> MarkResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MarkError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text).map_err(|e| MarkError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
