//! NVML backend
//!
//! Implements the native library contract on top of nvml-wrapper. Every
//! handle derived from the connection shares the same `Nvml` instance; NVML
//! is shut down when the connection is released after all derived handles.

mod device;

pub use device::{NvmlFanTuning, NvmlGpu, NvmlPerformanceMonitor, NvmlTuningService};

use crate::error::NativeError;
use crate::native::traits::{
    GpuDevice, NativeConnection, NativeLibrary, PerformanceMonitor, Release, SystemServices,
    TuningService,
};

use nvml_wrapper::Nvml;
use std::sync::Arc;

/// NVML as a native hardware library
#[derive(Debug, Default)]
pub struct NvmlLibrary;

impl NvmlLibrary {
    /// Create the library entry point (does not load NVML yet)
    pub fn new() -> Self {
        Self
    }
}

impl NativeLibrary for NvmlLibrary {
    fn name(&self) -> &str {
        "NVML"
    }

    fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError> {
        let nvml = Nvml::init().map_err(|e| match e {
            nvml_wrapper::error::NvmlError::LibloadingError(_) => NativeError::LibraryNotFound,
            nvml_wrapper::error::NvmlError::DriverNotLoaded => {
                NativeError::InitializationFailed("NVIDIA driver not loaded".to_string())
            }
            other => NativeError::InitializationFailed(other.to_string()),
        })?;

        Ok(Box::new(NvmlConnection {
            nvml: Some(Arc::new(nvml)),
        }))
    }
}

/// Convert an nvml-wrapper error to our error type
pub(crate) fn convert_error(err: nvml_wrapper::error::NvmlError) -> NativeError {
    use nvml_wrapper::error::NvmlError as NE;
    match err {
        NE::Uninitialized => NativeError::NotReady("NVML is not initialized".to_string()),
        NE::NotSupported => {
            NativeError::NotSupported("Operation not supported by this GPU".to_string())
        }
        NE::NoPermission => {
            NativeError::InsufficientPermissions("Insufficient permissions".to_string())
        }
        NE::NotFound => NativeError::DeviceNotFound(0),
        NE::GpuLost => NativeError::GpuLost,
        NE::InvalidArg => NativeError::InvalidArgument("Invalid argument".to_string()),
        _ => NativeError::Unknown(err.to_string()),
    }
}

/// Borrow the shared NVML instance of a handle, failing once released
pub(crate) fn live<'a>(
    nvml: &'a Option<Arc<Nvml>>,
    kind: &'static str,
) -> Result<&'a Nvml, NativeError> {
    nvml.as_deref().ok_or(NativeError::Released(kind))
}

/// Open NVML connection
pub struct NvmlConnection {
    nvml: Option<Arc<Nvml>>,
}

impl NativeConnection for NvmlConnection {
    fn system_services(&mut self) -> Result<Box<dyn SystemServices>, NativeError> {
        let nvml = self
            .nvml
            .as_ref()
            .ok_or(NativeError::Released("Connection"))?;

        // A successful device count is the readiness confirmation
        nvml.device_count().map_err(convert_error)?;

        Ok(Box::new(NvmlSystemServices {
            nvml: Some(Arc::clone(nvml)),
        }))
    }
}

impl Release for NvmlConnection {
    fn release(&mut self) -> Result<(), NativeError> {
        let Some(nvml) = self.nvml.take() else {
            return Ok(());
        };

        match Arc::try_unwrap(nvml) {
            Ok(nvml) => nvml.shutdown().map_err(convert_error),
            Err(_still_shared) => Err(NativeError::Unknown(
                "NVML handles still alive at shutdown".to_string(),
            )),
        }
    }
}

/// NVML system services handle
pub struct NvmlSystemServices {
    nvml: Option<Arc<Nvml>>,
}

impl NvmlSystemServices {
    fn shared(&self) -> Result<Arc<Nvml>, NativeError> {
        self.nvml
            .clone()
            .ok_or(NativeError::Released("System services"))
    }
}

impl SystemServices for NvmlSystemServices {
    fn devices(&mut self) -> Result<Vec<Box<dyn GpuDevice>>, NativeError> {
        let shared = self.shared()?;
        let count = shared.device_count().map_err(convert_error)?;

        let mut devices: Vec<Box<dyn GpuDevice>> = Vec::with_capacity(count as usize);
        for index in 0..count {
            let name = shared
                .device_by_index(index)
                .and_then(|d| d.name())
                .map_err(|e| match e {
                    nvml_wrapper::error::NvmlError::NotFound => NativeError::DeviceNotFound(index),
                    other => convert_error(other),
                })?;
            devices.push(Box::new(NvmlGpu::new(Arc::clone(&shared), index, name)));
        }

        Ok(devices)
    }

    fn tuning_service(&mut self) -> Result<Box<dyn TuningService>, NativeError> {
        Ok(Box::new(NvmlTuningService::new(self.shared()?)))
    }

    fn performance_monitor(&mut self) -> Result<Box<dyn PerformanceMonitor>, NativeError> {
        Ok(Box::new(NvmlPerformanceMonitor::new(self.shared()?)))
    }
}

impl Release for NvmlSystemServices {
    fn release(&mut self) -> Result<(), NativeError> {
        self.nvml = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require actual NVIDIA hardware and drivers
    // They will be skipped if NVML is not available

    #[test]
    #[ignore = "Requires NVIDIA GPU"]
    fn test_nvml_connect() {
        let library = NvmlLibrary::new();
        let mut connection = library.connect().unwrap();
        let mut system = connection.system_services().unwrap();
        assert!(!system.devices().unwrap().is_empty());
        system.release().unwrap();
        connection.release().unwrap();
    }

    #[test]
    fn test_convert_uninitialized_is_not_ready() {
        let err = convert_error(nvml_wrapper::error::NvmlError::Uninitialized);
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_convert_gpu_lost() {
        let err = convert_error(nvml_wrapper::error::NvmlError::GpuLost);
        assert_eq!(err, NativeError::GpuLost);
    }
}
