//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::error::ConfigError;
use crate::plugin::PluginOptions;
use crate::services::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Native library startup settings
    pub startup: StartupConfig,
    /// Performance tracking settings
    pub tracking: TrackingConfig,
    /// Reference host polling settings
    pub polling: PollingConfig,
}

impl Config {
    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.startup.retry_max == 0 {
            return Err(ConfigError::InvalidValue {
                key: "startup.retry_max".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.tracking.enabled && self.tracking.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tracking.interval_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Options for the lifecycle coordinator
    pub fn plugin_options(&self) -> PluginOptions {
        PluginOptions {
            retry: RetryPolicy::new(
                self.startup.retry_max,
                Duration::from_millis(self.startup.retry_interval_ms),
            ),
            tracking_interval: self
                .tracking
                .enabled
                .then(|| Duration::from_millis(self.tracking.interval_ms)),
        }
    }

    /// Interval between refresh ticks of the reference host
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
}

/// Native library startup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Attempts to confirm the library is ready
    pub retry_max: u32,
    /// Wait between attempts in milliseconds
    pub retry_interval_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            retry_max: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            retry_interval_ms: RetryPolicy::DEFAULT_INTERVAL.as_millis() as u64,
        }
    }
}

/// Performance tracking configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Start a tracking session after initialization
    pub enabled: bool,
    /// Sampling interval in milliseconds
    pub interval_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 1000,
        }
    }
}

/// Polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Refresh tick interval in milliseconds
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.verbose);
        assert_eq!(config.startup.retry_max, 5);
        assert_eq!(config.startup.retry_interval_ms, 1000);
        assert!(!config.tracking.enabled);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_plugin_options() {
        let mut config = Config::default();
        config.startup.retry_max = 3;
        config.startup.retry_interval_ms = 250;

        let options = config.plugin_options();
        assert_eq!(
            options.retry,
            RetryPolicy::new(3, Duration::from_millis(250))
        );
        assert_eq!(options.tracking_interval, None);

        config.tracking.enabled = true;
        config.tracking.interval_ms = 500;
        assert_eq!(
            config.plugin_options().tracking_interval,
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = Config::default();
        config.startup.retry_max = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[startup]\nretry_max = 2\n").unwrap();
        assert_eq!(config.startup.retry_max, 2);
        assert_eq!(config.startup.retry_interval_ms, 1000);
        assert_eq!(config.polling.interval_ms, 1000);
    }
}
