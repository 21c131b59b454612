//! Trait definitions for the native hardware library
//!
//! These traits abstract over the vendor library so the plugin core can be
//! exercised against the mock backend in tests and a real library in
//! production. Every handle is released explicitly through [`Release`]; the
//! plugin never relies on drop order to free native resources.

use crate::domain::{DeviceId, DeviceInfo, FanDuty, MetricsSnapshot};
use crate::error::NativeError;

use std::time::Duration;

/// Explicit release of a native handle
///
/// Releasing an already released handle is a no-op. Any other call on a
/// released handle fails with [`NativeError::Released`].
pub trait Release {
    /// Release the underlying native resource
    fn release(&mut self) -> Result<(), NativeError>;
}

/// Entry point of a native hardware library
pub trait NativeLibrary: Send {
    /// Short library name, used as the plugin display name
    fn name(&self) -> &str;

    /// Open the (single) connection to the library
    ///
    /// The library may return before it is able to answer queries; see
    /// [`NativeConnection::system_services`].
    fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError>;
}

/// Live connection to the native library
pub trait NativeConnection: Release + Send {
    /// Get the system services handle
    ///
    /// Returns [`NativeError::NotReady`] while the library is still starting.
    fn system_services(&mut self) -> Result<Box<dyn SystemServices>, NativeError>;
}

/// Root service handle issued by a connection
pub trait SystemServices: Release + Send {
    /// Enumerate physical GPUs, in library order
    fn devices(&mut self) -> Result<Vec<Box<dyn GpuDevice>>, NativeError>;

    /// Get the tuning service
    fn tuning_service(&mut self) -> Result<Box<dyn TuningService>, NativeError>;

    /// Get the performance monitor service
    fn performance_monitor(&mut self) -> Result<Box<dyn PerformanceMonitor>, NativeError>;
}

/// Handle to one physical GPU
pub trait GpuDevice: Release + Send + Sync {
    /// Process-unique device id
    fn id(&self) -> DeviceId;

    /// Display name
    fn name(&self) -> &str;

    /// Detached identification for sensor records
    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.id(), self.name())
    }
}

/// Service answering tuning capability queries
pub trait TuningService: Release + Send {
    /// Whether the device allows direct fan duty control
    fn supports_manual_fan_tuning(&self, device: &dyn GpuDevice) -> Result<bool, NativeError>;

    /// Acquire the manual fan tuning handle for a capable device
    fn manual_fan_tuning(
        &self,
        device: &dyn GpuDevice,
    ) -> Result<Box<dyn ManualFanTuning>, NativeError>;
}

/// Write access to one device's fan duty
pub trait ManualFanTuning: Release + Send {
    /// Current duty as reported by the device
    fn duty(&self) -> Result<FanDuty, NativeError>;

    /// Drive the fans at a fixed duty
    fn set_duty(&mut self, duty: FanDuty) -> Result<(), NativeError>;

    /// Hand fan control back to the device's automatic policy
    fn reset(&mut self) -> Result<(), NativeError>;
}

/// Service producing telemetry snapshots
pub trait PerformanceMonitor: Release + Send {
    /// Query one complete snapshot for a device
    fn metrics(&self, device: &dyn GpuDevice) -> Result<MetricsSnapshot, NativeError>;

    /// Start a background tracking session sampling at `interval`
    fn start_tracking(
        &mut self,
        interval: Duration,
    ) -> Result<Box<dyn TrackingSession>, NativeError>;
}

/// An active performance tracking session
pub trait TrackingSession: Release + Send {}
