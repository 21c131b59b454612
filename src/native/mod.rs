//! Native hardware library abstraction layer
//!
//! Provides trait-based abstractions over the vendor library for testability,
//! and the NVML-backed implementation used in production.

pub mod nvml;
pub mod traits;

pub use nvml::NvmlLibrary;
pub use traits::{
    GpuDevice, ManualFanTuning, NativeConnection, NativeLibrary, PerformanceMonitor, Release,
    SystemServices, TrackingSession, TuningService,
};
