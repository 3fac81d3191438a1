//! Persistent application configuration
//!
//! Stores the selected input device and the detector tuning in a JSON file
//! at `<data_dir>/clapsense/config.json`.

use clapsense_core::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input device name (None = host default)
    #[serde(default)]
    pub device: Option<String>,
    /// Detector tuning
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl AppConfig {
    /// Config file path: `<data_dir>/clapsense/config.json`
    pub fn path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clapsense")
            .join("config.json")
    }

    /// Load config from the default path, falling back to defaults on any error
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults on any error
    ///
    /// A file that parses but fails validation is also replaced by defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                return Self::default();
            }
        };

        let config: Self = match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                return Self::default();
            }
        };

        if let Err(e) = config.detector.validate() {
            tracing::warn!(path = %path.display(), error = %e, "Invalid detector config, using defaults");
            return Self {
                device: config.device,
                detector: DetectorConfig::default(),
            };
        }

        tracing::info!(path = %path.display(), "Loaded config from disk");
        config
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }
}
