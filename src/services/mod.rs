//! Service layer between the native library and the plugin
//!
//! Services own native handles (devices, tuning handles) and cached telemetry;
//! the lifecycle coordinator owns the services.

pub mod catalog;
pub mod metrics_cache;
pub mod retry;
pub mod tuning;

pub use catalog::DeviceCatalog;
pub use metrics_cache::MetricsCache;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use tuning::{
    DeviceCapability, ResolvedDevice, SharedFanTuning, TuningCapabilityResolver, WeakFanTuning,
};
