//! Tuning capability resolution
//!
//! Decides once, at initialization, which GPUs accept manual fan duty and
//! holds the tuning handles for those that do.

use crate::domain::{DeviceId, DeviceInfo, FanDuty};
use crate::error::NativeError;
use crate::native::{GpuDevice, ManualFanTuning, TuningService};
use crate::services::DeviceCatalog;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Tuning handle owned by the resolver; control records only hold weak references
pub struct SharedFanTuning(Arc<Mutex<Box<dyn ManualFanTuning>>>);

impl SharedFanTuning {
    fn new(handle: Box<dyn ManualFanTuning>) -> Self {
        Self(Arc::new(Mutex::new(handle)))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn ManualFanTuning>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-owning reference for control records
    pub fn downgrade(&self) -> WeakFanTuning {
        WeakFanTuning(Arc::downgrade(&self.0))
    }

    /// Current duty reported by the handle
    pub fn duty(&self) -> Result<FanDuty, NativeError> {
        self.lock().duty()
    }

    /// Drive the fans at a fixed duty
    pub fn set_duty(&self, duty: FanDuty) -> Result<(), NativeError> {
        self.lock().set_duty(duty)
    }

    /// Return to automatic fan control
    pub fn reset(&self) -> Result<(), NativeError> {
        self.lock().reset()
    }

    fn release(&self) -> Result<(), NativeError> {
        self.lock().release()
    }
}

/// Weak reference to a tuning handle; dead once the resolver released it
#[derive(Clone)]
pub struct WeakFanTuning(Weak<Mutex<Box<dyn ManualFanTuning>>>);

impl WeakFanTuning {
    /// Upgrade while the owning resolver still holds the handle
    pub fn upgrade(&self) -> Option<SharedFanTuning> {
        self.0.upgrade().map(SharedFanTuning)
    }
}

/// Capability of one GPU, fixed at resolution time
pub enum DeviceCapability {
    /// Manual fan duty is available through the handle
    Tunable(SharedFanTuning),
    /// Sensors only
    ReadOnly,
}

/// A GPU together with its resolved capability
pub struct ResolvedDevice {
    pub info: DeviceInfo,
    pub capability: DeviceCapability,
}

impl ResolvedDevice {
    /// Whether the device accepts manual fan duty
    pub fn is_tunable(&self) -> bool {
        matches!(self.capability, DeviceCapability::Tunable(_))
    }
}

/// Per-device tuning capabilities and the handles of tunable devices
#[derive(Default)]
pub struct TuningCapabilityResolver {
    resolved: Vec<ResolvedDevice>,
}

impl TuningCapabilityResolver {
    /// Resolve the capability of every catalog device
    ///
    /// A device whose capability query or handle acquisition fails is logged
    /// and treated as read-only; resolution continues with the others.
    pub fn resolve_all(tuning: &dyn TuningService, catalog: &DeviceCatalog) -> Self {
        let resolved = catalog
            .devices()
            .map(|device| ResolvedDevice {
                info: device.info(),
                capability: Self::resolve(tuning, device),
            })
            .collect();

        Self { resolved }
    }

    fn resolve(tuning: &dyn TuningService, device: &dyn GpuDevice) -> DeviceCapability {
        match tuning.supports_manual_fan_tuning(device) {
            Ok(true) => match tuning.manual_fan_tuning(device) {
                Ok(handle) => {
                    log::debug!("GPU {} supports manual fan tuning", device.id());
                    DeviceCapability::Tunable(SharedFanTuning::new(handle))
                }
                Err(e) => {
                    log::warn!(
                        "Failed to acquire fan tuning for GPU {}, treating as read-only: {}",
                        device.id(),
                        e
                    );
                    DeviceCapability::ReadOnly
                }
            },
            Ok(false) => DeviceCapability::ReadOnly,
            Err(e) => {
                log::warn!(
                    "Fan tuning capability query failed for GPU {}, skipping: {}",
                    device.id(),
                    e
                );
                DeviceCapability::ReadOnly
            }
        }
    }

    /// Every device in catalog order with its capability
    pub fn resolved(&self) -> &[ResolvedDevice] {
        &self.resolved
    }

    /// Tuning handle of a device, if it is tunable
    pub fn handle(&self, id: DeviceId) -> Option<&SharedFanTuning> {
        self.resolved
            .iter()
            .find(|r| r.info.id == id)
            .and_then(|r| match &r.capability {
                DeviceCapability::Tunable(handle) => Some(handle),
                DeviceCapability::ReadOnly => None,
            })
    }

    /// Number of tunable devices
    pub fn tunable_count(&self) -> usize {
        self.resolved.iter().filter(|r| r.is_tunable()).count()
    }

    /// Release every tuning handle, continuing past failures
    ///
    /// Returns the number of handles that failed to release.
    pub fn release_all(&mut self) -> usize {
        let mut failures = 0;
        for resolved in self.resolved.drain(..) {
            if let DeviceCapability::Tunable(handle) = resolved.capability {
                if let Err(e) = handle.release() {
                    log::warn!(
                        "Failed to release fan tuning for GPU {}: {}",
                        resolved.info.id,
                        e
                    );
                    failures += 1;
                }
            }
        }
        failures
    }
}
