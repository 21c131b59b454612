//! Device catalog
//!
//! Owns the GPU handles enumerated from the system services for the lifetime
//! of the plugin.

use crate::domain::{DeviceId, DeviceInfo};
use crate::error::NativeError;
use crate::native::{GpuDevice, SystemServices};

/// Ordered set of enumerated GPUs
///
/// Order is whatever the native library returned and stays fixed until
/// release; it defines the order of registered sensors.
#[derive(Default)]
pub struct DeviceCatalog {
    devices: Vec<Box<dyn GpuDevice>>,
}

impl DeviceCatalog {
    /// Enumerate devices from the system services handle
    pub fn enumerate(system: &mut dyn SystemServices) -> Result<Self, NativeError> {
        let devices = system.devices()?;
        for device in &devices {
            log::debug!("Found GPU {}", device.info());
        }
        Ok(Self { devices })
    }

    /// Device handles in catalog order
    pub fn devices(&self) -> impl Iterator<Item = &dyn GpuDevice> {
        self.devices.iter().map(|d| d.as_ref())
    }

    /// Look up a device by id
    pub fn get(&self, id: DeviceId) -> Option<&dyn GpuDevice> {
        self.devices().find(|d| d.id() == id)
    }

    /// Detached identification of every device, in catalog order
    pub fn infos(&self) -> Vec<DeviceInfo> {
        self.devices().map(|d| d.info()).collect()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices were found
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Release every device handle, continuing past failures
    ///
    /// Returns the number of handles that failed to release.
    pub fn release_all(&mut self) -> usize {
        let mut failures = 0;
        for mut device in self.devices.drain(..) {
            if let Err(e) = device.release() {
                log::warn!("Failed to release GPU {}: {}", device.id(), e);
                failures += 1;
            }
        }
        failures
    }
}
