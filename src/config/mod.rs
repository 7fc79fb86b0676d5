//! Configuration module for PidScope-RS
//!
//! This module handles pipeline configuration:
//! - Source selection (serial vs. synthetic)
//! - Serial transport framing parameters
//! - Channel sizing and shutdown timing
//!
//! # Config Location
//!
//! Configuration is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.hxyulin.pidscope-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.pidscope-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.pidscope-rs\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use pidscope_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.serial.port = "/dev/ttyUSB0".to_string();
//! config.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.pidscope-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default capacity of the status and signal channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// Default synthetic generator tick period in milliseconds
pub const DEFAULT_SYNTH_TICK_MS: u64 = 200;

/// Default transport read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Default byte-pump backoff when a read returns no data, in milliseconds
pub const DEFAULT_POLL_BACKOFF_MS: u64 = 100;

/// Default budget for waiting on the terminal halt signal, in milliseconds
pub const DEFAULT_HALT_TIMEOUT_MS: u64 = 2000;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        TelemetryError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            TelemetryError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Which source implementation to run
    #[serde(default)]
    pub source: SourceKind,

    /// Serial transport settings (used when `source = "serial"`)
    #[serde(default)]
    pub serial: SerialConfig,

    /// Synthetic generator settings (used when `source = "synthetic"`)
    #[serde(default)]
    pub synth: SynthConfig,

    /// Output channel sizing and shutdown timing
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl AppConfig {
    /// Load config from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TelemetryError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| TelemetryError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let path = config_path()
            .ok_or_else(|| TelemetryError::Config("Could not determine config path".to_string()))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TelemetryError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| TelemetryError::Config(format!("Failed to write config: {}", e)))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(CONFIG_FILE))
    }

    /// Validate that the selected source can actually be constructed
    pub fn validate(&self) -> Result<()> {
        if self.source == SourceKind::Serial && self.serial.port.is_empty() {
            return Err(TelemetryError::Config(
                "serial source selected but no port name configured".to_string(),
            ));
        }
        if self.channel.capacity == 0 {
            return Err(TelemetryError::Config(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        // Synthetic source needs no port
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_serial_without_port_rejected() {
        let config = AppConfig {
            source: SourceKind::Serial,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.channel.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.source = SourceKind::Serial;
        config.serial.port = "/dev/ttyACM0".to_string();
        config.serial.baud = 115_200;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.source, SourceKind::Serial);
        assert_eq!(loaded.serial.port, "/dev/ttyACM0");
        assert_eq!(loaded.serial.baud, 115_200);
        assert_eq!(loaded.channel.capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str("source = \"synthetic\"").unwrap();
        assert_eq!(config.synth.tick_ms, DEFAULT_SYNTH_TICK_MS);
        assert_eq!(config.serial.baud, DEFAULT_BAUD_RATE);
    }
}
