//! fanbridge - GPU sensor plugin library
//!
//! Bridges a native GPU library to a host sensor framework: one fan sensor
//! and three temperature sensors per GPU, plus a fan duty control for every
//! GPU that allows manual fan tuning.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers of the reference host
//! - [`config`]: Configuration system
//! - [`domain`]: Domain models with validation
//! - [`error`]: Error types
//! - [`mock`]: Scripted native library for tests and simulation
//! - [`native`]: Native library abstraction layer and NVML backend
//! - [`plugin`]: Lifecycle coordinator and host-facing sensors
//! - [`services`]: Device catalog, tuning resolution, metrics caching

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod mock;
pub mod native;
pub mod plugin;
pub mod services;

pub use error::{PluginError, Result};
