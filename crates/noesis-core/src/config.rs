//! Engine configuration
//!
//! A fixed enumeration of recognized options, loadable from a TOML file or
//! built in code via `EngineConfig::default()` and struct-update syntax.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Engine configuration: the fixed enumeration of recognized options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the persistent backing file.
    pub store_path: String,
    /// Maximum cached nodes.
    pub cache_size: usize,
    /// When false, runs ephemerally even if the store path is usable.
    pub persistence_enabled: bool,
    /// Escape-time iteration cap.
    pub max_iter: u32,
    /// Escape-time threshold.
    pub escape_radius: f64,
    /// Beta-reduction step cap.
    pub default_evaluation_fuel: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: "knowledge.db".to_string(),
            cache_size: 1000,
            persistence_enabled: true,
            max_iter: 100,
            escape_radius: 2.0,
            default_evaluation_fuel: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file omits.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
