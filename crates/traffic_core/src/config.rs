//! Application configuration
//!
//! Layers built-in defaults, an optional TOML file and `TRAFFIC_*`
//! environment variables (`TRAFFIC_MODEL__PATH`, `TRAFFIC_LOGGING__LEVEL`,
//! ...). Loaded once at start-up and never mutated.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifact::ArtifactLoader;
use crate::errors::{Result, TrafficError};
use crate::inputs::StaticDefaults;

/// Config file picked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/traffic.toml";

/// Model artifact settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Artifact file on local disk
    pub path: PathBuf,
    /// Pinned BLAKE3 fingerprint of the artifact
    pub expected_hash: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/traffic_model.json"),
            expected_hash: None,
        }
    }
}

impl ModelConfig {
    pub fn loader(&self) -> ArtifactLoader {
        match &self.expected_hash {
            Some(hash) => ArtifactLoader::new().with_expected_hash(hash.clone()),
            None => ArtifactLoader::new(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub defaults: StaticDefaults,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration. An explicit path must exist; otherwise
    /// [`DEFAULT_CONFIG_PATH`] is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(path) if !path.exists() => {
                return Err(TrafficError::Config(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved {
            builder = builder.add_source(File::from(path.as_path()));
        }
        builder = builder.add_source(
            Environment::with_prefix("TRAFFIC")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        if let Some(path) = &resolved {
            info!(path = %path.display(), "configuration loaded");
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.defaults.validate()?;
        if !matches!(self.logging.format.as_str(), "pretty" | "compact" | "json") {
            return Err(TrafficError::Config(format!(
                "unknown logging.format {:?} (expected pretty, compact or json)",
                self.logging.format
            )));
        }
        if let Some(hash) = &self.model.expected_hash {
            let hash = hash.trim();
            if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(TrafficError::Config(
                    "model.expected_hash must be 64 hex characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}
