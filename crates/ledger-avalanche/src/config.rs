//! Driver configuration handling.
//!
//! Settings are read from a TOML file and then overridden from the
//! environment:
//!
//! ```toml
//! device_index = 0
//! chunk_size = 250
//!
//! [min_version]
//! major = 0
//! minor = 6
//! patch = 5
//!
//! [logging]
//! level = "debug"
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::apdu::Command;
use crate::ledger::params::{CHUNK_SIZE, CLA};
use crate::version::VersionInfo;

/// Overrides [`AppConfig::device_index`].
pub const ENV_DEVICE_INDEX: &str = "LEDGER_AVAX_DEVICE_INDEX";

/// Overrides [`AppConfig::chunk_size`].
pub const ENV_CHUNK_SIZE: &str = "LEDGER_AVAX_CHUNK_SIZE";

/// Overrides [`LoggingOptions::level`].
pub const ENV_LOG: &str = "LEDGER_AVAX_LOG";

/// Top-level driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Index of the device to open, in enumeration order.
    pub device_index: usize,
    /// Class byte sent with every command.
    pub cla: u8,
    /// Upload chunk size in bytes.
    pub chunk_size: usize,
    /// Oldest app version accepted during discovery.
    pub min_version: VersionInfo,
    /// Logging configuration.
    pub logging: LoggingOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            cla: CLA,
            chunk_size: CHUNK_SIZE,
            min_version: VersionInfo::MINIMUM,
            logging: LoggingOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit path, or use defaults, then
    /// apply environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(path)?
        } else {
            tracing::debug!("No configuration file given, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LEDGER_AVAX_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(index) = lookup(ENV_DEVICE_INDEX) {
            match index.parse::<usize>() {
                Ok(parsed) => self.device_index = parsed,
                Err(e) => tracing::warn!("Ignoring {ENV_DEVICE_INDEX}={index}: {e}"),
            }
        }
        if let Some(size) = lookup(ENV_CHUNK_SIZE) {
            match size.parse::<usize>() {
                Ok(parsed) => self.chunk_size = parsed,
                Err(e) => tracing::warn!("Ignoring {ENV_CHUNK_SIZE}={size}: {e}"),
            }
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
    }

    /// Check that the settings can drive the protocol.
    pub fn validate(&self) -> Result<()> {
        if !(1..=Command::MAX_DATA).contains(&self.chunk_size) {
            return Err(Error::Config(format!(
                "chunk_size must be between 1 and {}, got {}",
                Command::MAX_DATA,
                self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Filter directive, e.g. `info` or `ledger_avalanche=trace`.
    pub level: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
