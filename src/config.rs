//! Configuration management for the tag index
//!
//! TOML configuration with environment variable overrides and defaults.
//!
//! ```toml
//! [index]
//! initial_capacity = 4096
//! pending_warn_threshold = 100000
//!
//! [logging]
//! log_level = "info"
//!
//! [monitoring]
//! metrics_enabled = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Index sizing and queue limits
    #[serde(default)]
    pub index: IndexConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Number of tag key/value pairs to preallocate
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Warn when this many entries remain pending after a drain (0 = never)
    #[serde(default = "default_pending_warn_threshold")]
    pub pending_warn_threshold: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Update Prometheus collectors
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_initial_capacity() -> usize { 1024 }
fn default_pending_warn_threshold() -> usize { 100_000 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            pending_warn_threshold: default_pending_warn_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            with_target: true,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TAGINDEX_INITIAL_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.index.initial_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("TAGINDEX_PENDING_WARN_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.index.pending_warn_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("TAGINDEX_METRICS_ENABLED") {
            if let Ok(b) = v.parse() {
                self.monitoring.metrics_enabled = b;
            }
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.log_level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.logging.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }
        if self.index.initial_capacity > u32::MAX as usize {
            return Err(Error::Configuration(
                "Initial capacity cannot exceed u32::MAX entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
