//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// An explicit path must load; without one the default locations are
    /// searched and a missing file leaves the defaults in place.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => self.config = ConfigFile::load(path)?,
            None => {
                if let Some(cfg) = ConfigFile::load_default() {
                    self.config = cfg;
                }
            }
        }
        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI polling interval
    pub fn with_poll_interval_ms(mut self, interval: Option<u64>) -> Self {
        if let Some(i) = interval {
            self.config.polling.interval_ms = i;
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
