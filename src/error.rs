//! Unified error types for fanbridge
//!
//! This module defines all error types used throughout the plugin.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Top-level plugin error type
#[derive(Error, Debug)]
pub enum PluginError {
    /// Error from the native hardware library
    #[error("Native library error: {0}")]
    Native(#[from] NativeError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from domain type validation
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// The native library never became ready
    #[error("Native library not ready after {attempts} attempts")]
    NotReadyAfterRetries { attempts: u32 },

    /// The plugin has not been initialized or has been closed
    #[error("Plugin is not operational")]
    NotOperational,

    /// A sensor or control outlived the resources backing it
    #[error("Sensor '{0}' refers to released resources")]
    SensorReleased(String),

    /// No control sensor with the given id
    #[error("Control not found: {0}")]
    ControlNotFound(String),

    /// IO error (output, file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by the native hardware library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// Library has returned from init but cannot answer queries yet
    #[error("Native library is not ready yet: {0}")]
    NotReady(String),

    /// Shared library could not be loaded
    #[error("Native GPU library not found. Is the GPU driver installed?")]
    LibraryNotFound,

    /// Failed to initialize the native library
    #[error("Failed to initialize native library: {0}")]
    InitializationFailed(String),

    /// Device not found by id
    #[error("GPU device not found with id {0}")]
    DeviceNotFound(u32),

    /// Operation not supported by this GPU
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Insufficient permissions
    #[error("Insufficient permissions: {0}. Try running with elevated privileges.")]
    InsufficientPermissions(String),

    /// GPU is lost (fallen off bus, etc.)
    #[error("GPU is lost or has become inaccessible")]
    GpuLost,

    /// Invalid argument passed to the library
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Handle was used after it had been released
    #[error("{0} handle has already been released")]
    Released(&'static str),

    /// Unknown native error
    #[error("Native error: {0}")]
    Unknown(String),
}

impl NativeError {
    /// Whether this is the transient "library still starting" condition
    pub fn is_not_ready(&self) -> bool {
        matches!(self, NativeError::NotReady(_))
    }
}

/// Errors from domain type validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid fan duty value (must be 0-100)
    #[error("Invalid fan duty: {0}% (must be 0-100)")]
    InvalidFanDuty(f32),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using PluginError
pub type Result<T> = std::result::Result<T, PluginError>;
