//! Configuration file handling for ~/.marketlens/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::settings::ConfigFile;
use crate::map::MapConfig;
use crate::market::MarketConfig;
use crate::prefetch::PrefetchConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.marketlens/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_config_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Commented INI representation, as written by [`ConfigFile::save_to`].
    pub fn to_config_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Create the default config file at `path` if it doesn't exist.
    ///
    /// Returns true if a file was written.
    pub fn ensure_exists_at(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Settings for [`MarketResolutionService`](crate::market::MarketResolutionService).
    pub fn market_config(&self) -> MarketConfig {
        MarketConfig {
            prefilter_margin_degrees: self.market.prefilter_margin_degrees,
            max_radius_miles: self.market.max_radius_miles,
            default_radius_miles: self.market.default_radius_miles,
            identifier_ttl: Duration::from_secs(self.identifiers.ttl_secs),
            retry_delay: Duration::from_millis(self.network.retry_delay_ms),
        }
    }

    /// Settings for embedders that build a
    /// [`MapLayerSynchronizer`](crate::map::MapLayerSynchronizer) from the config file.
    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            debounce: Duration::from_millis(self.map.debounce_ms),
            polygon_points: self.map.polygon_points,
            container_probe_attempts: self.map.container_probe_attempts,
            container_probe_base: Duration::from_millis(self.map.container_probe_base_ms),
        }
    }

    /// Settings for embedders that build a
    /// [`PredictivePrefetcher`](crate::prefetch::PredictivePrefetcher) from the config file.
    pub fn prefetch_config(&self) -> PrefetchConfig {
        PrefetchConfig {
            ttl: Duration::from_secs(self.prefetch.ttl_secs),
            latency_threshold: Duration::from_millis(self.prefetch.latency_threshold_ms),
            max_predictions: self.prefetch.max_predictions,
            ..PrefetchConfig::default()
        }
    }
}

/// Get the path to the config directory (~/.marketlens).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".marketlens")
}

/// Get the path to the config file (~/.marketlens/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
