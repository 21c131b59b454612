//! Domain models for fanbridge
//!
//! This module contains all domain types with validation.
//! Types are validated on construction (fail-fast pattern).

pub mod fan;
pub mod gpu;
pub mod metrics;
pub mod thermal;

pub use fan::{FanDuty, FanRpm};
pub use gpu::{DeviceId, DeviceInfo};
pub use metrics::MetricsSnapshot;
pub use thermal::Temperature;
