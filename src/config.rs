//! Configuration management for Helion
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{HelionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inverter TCP connection configuration
    pub inverter: InverterConfig,

    /// Energy-today glitch filter tuning
    pub glitch_filter: GlitchFilterConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

/// Inverter TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InverterConfig {
    /// IP address or hostname of the inverter's WiFi dongle
    pub host: String,

    /// TCP port of the local monitor service
    pub port: u16,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Per-chunk read timeout in milliseconds. The device never sends a frame
    /// terminator; a silent window of this length ends the response.
    pub read_timeout_ms: u64,

    /// Upper bound on read iterations per command
    pub max_read_chunks: u32,
}

/// Plausibility ceiling for daily energy counter jumps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchFilterConfig {
    /// Slope of the allowed-jump ceiling in kW
    pub max_power_kw: f64,

    /// Fixed headroom added to the ceiling in kWh
    pub margin_kwh: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file (or directory for rotated files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for InverterConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.50".to_string(),
            port: 8899,
            connect_timeout_ms: 5000,
            read_timeout_ms: 500,
            max_read_chunks: 40,
        }
    }
}

impl Default for GlitchFilterConfig {
    fn default() -> Self {
        Self {
            max_power_kw: 20.0,
            margin_kwh: 0.5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/helion.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inverter: InverterConfig::default(),
            glitch_filter: GlitchFilterConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_ms: 30000,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "helion_config.yaml",
            "/data/helion_config.yaml",
            "/etc/helion/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.inverter.host.is_empty() {
            return Err(HelionError::validation(
                "inverter.host",
                "Host cannot be empty",
            ));
        }

        if self.inverter.port == 0 {
            return Err(HelionError::validation(
                "inverter.port",
                "Port must be greater than 0",
            ));
        }

        if self.inverter.max_read_chunks == 0 {
            return Err(HelionError::validation(
                "inverter.max_read_chunks",
                "Must be greater than 0",
            ));
        }

        if self.inverter.read_timeout_ms == 0 {
            return Err(HelionError::validation(
                "inverter.read_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(HelionError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.glitch_filter.max_power_kw <= 0.0 {
            return Err(HelionError::validation(
                "glitch_filter.max_power_kw",
                "Must be positive",
            ));
        }

        if self.glitch_filter.margin_kwh < 0.0 {
            return Err(HelionError::validation(
                "glitch_filter.margin_kwh",
                "Must not be negative",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inverter.port, 8899);
        assert_eq!(config.inverter.max_read_chunks, 40);
        assert_eq!(config.poll_interval_ms, 30000);
        assert!((config.glitch_filter.max_power_kw - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.inverter.host = String::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.inverter.port = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.glitch_filter.max_power_kw = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.inverter.port, deserialized.inverter.port);
        assert_eq!(config.poll_interval_ms, deserialized.poll_interval_ms);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("inverter:\n  host: 10.0.0.9\n").unwrap();
        assert_eq!(cfg.inverter.host, "10.0.0.9");
        assert_eq!(cfg.inverter.port, 8899);
        assert_eq!(cfg.logging.level, "INFO");
    }
}
