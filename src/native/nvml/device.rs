//! NVML device, tuning and monitoring handles

use crate::domain::{DeviceId, FanDuty, FanRpm, MetricsSnapshot, Temperature};
use crate::error::NativeError;
use crate::native::nvml::{convert_error, live};
use crate::native::traits::{
    GpuDevice, ManualFanTuning, PerformanceMonitor, Release, TrackingSession, TuningService,
};

use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::enums::device::{FanControlPolicy, SampleValue};
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::struct_wrappers::device::FieldValueSample;
use nvml_wrapper::structs::device::FieldId;
use nvml_wrapper::{Device, Nvml};
use nvml_wrapper_sys::bindings::field_id;
use std::sync::Arc;
use std::time::Duration;

fn device_by_id(nvml: &Nvml, id: DeviceId) -> Result<Device<'_>, NativeError> {
    nvml.device_by_index(id.as_u32()).map_err(|e| match e {
        NvmlError::NotFound => NativeError::DeviceNotFound(id.as_u32()),
        other => convert_error(other),
    })
}

/// NVML GPU handle, addressed by NVML index
pub struct NvmlGpu {
    nvml: Option<Arc<Nvml>>,
    id: DeviceId,
    name: String,
}

impl NvmlGpu {
    /// Create a new NVML device handle
    pub fn new(nvml: Arc<Nvml>, index: u32, name: String) -> Self {
        Self {
            nvml: Some(nvml),
            id: DeviceId::new(index),
            name,
        }
    }
}

impl GpuDevice for NvmlGpu {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Release for NvmlGpu {
    fn release(&mut self) -> Result<(), NativeError> {
        self.nvml = None;
        Ok(())
    }
}

/// NVML manual fan control capability queries
pub struct NvmlTuningService {
    nvml: Option<Arc<Nvml>>,
}

impl NvmlTuningService {
    pub(crate) fn new(nvml: Arc<Nvml>) -> Self {
        Self { nvml: Some(nvml) }
    }
}

impl TuningService for NvmlTuningService {
    fn supports_manual_fan_tuning(&self, device: &dyn GpuDevice) -> Result<bool, NativeError> {
        let nvml = live(&self.nvml, "Tuning service")?;
        let handle = device_by_id(nvml, device.id())?;

        let fan_count = match handle.num_fans() {
            Ok(count) => count,
            Err(NvmlError::NotSupported) => return Ok(false),
            Err(e) => return Err(convert_error(e)),
        };
        if fan_count == 0 {
            return Ok(false);
        }

        // Policy readback is required to hand control back on reset
        match handle.fan_control_policy(0) {
            Ok(_) => Ok(true),
            Err(NvmlError::NotSupported) => Ok(false),
            Err(e) => Err(convert_error(e)),
        }
    }

    fn manual_fan_tuning(
        &self,
        device: &dyn GpuDevice,
    ) -> Result<Box<dyn ManualFanTuning>, NativeError> {
        let nvml = live(&self.nvml, "Tuning service")?;
        let fan_count = device_by_id(nvml, device.id())?
            .num_fans()
            .map_err(convert_error)?;

        Ok(Box::new(NvmlFanTuning {
            nvml: self.nvml.clone(),
            id: device.id(),
            fan_count,
            manual: false,
        }))
    }
}

impl Release for NvmlTuningService {
    fn release(&mut self) -> Result<(), NativeError> {
        self.nvml = None;
        Ok(())
    }
}

/// Manual fan duty control for every fan of one GPU
pub struct NvmlFanTuning {
    nvml: Option<Arc<Nvml>>,
    id: DeviceId,
    fan_count: u32,
    manual: bool,
}

impl ManualFanTuning for NvmlFanTuning {
    fn duty(&self) -> Result<FanDuty, NativeError> {
        let nvml = live(&self.nvml, "Fan tuning")?;
        let speed = device_by_id(nvml, self.id)?
            .fan_speed(0)
            .map_err(convert_error)?;

        // NVML might report > 100 in some edge cases
        Ok(FanDuty::saturating(speed))
    }

    fn set_duty(&mut self, duty: FanDuty) -> Result<(), NativeError> {
        let nvml = live(&self.nvml, "Fan tuning")?;
        let mut handle = device_by_id(nvml, self.id)?;

        for fan_idx in 0..self.fan_count {
            handle
                .set_fan_speed(fan_idx, duty.as_percentage() as u32)
                .map_err(convert_error)?;
        }

        self.manual = true;
        log::debug!("GPU {}: fan duty set to {}", self.id, duty);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), NativeError> {
        let nvml = live(&self.nvml, "Fan tuning")?;
        let mut handle = device_by_id(nvml, self.id)?;

        for fan_idx in 0..self.fan_count {
            handle
                .set_fan_control_policy(fan_idx, FanControlPolicy::TemperatureContinousSw)
                .map_err(convert_error)?;
        }

        self.manual = false;
        log::debug!("GPU {}: fan control returned to automatic", self.id);
        Ok(())
    }
}

impl Release for NvmlFanTuning {
    fn release(&mut self) -> Result<(), NativeError> {
        if self.nvml.is_none() {
            return Ok(());
        }

        // Never leave fans pinned at a manual duty once we stop driving them
        let restored = if self.manual { self.reset() } else { Ok(()) };
        self.nvml = None;
        restored
    }
}

/// NVML telemetry queries
pub struct NvmlPerformanceMonitor {
    nvml: Option<Arc<Nvml>>,
}

impl NvmlPerformanceMonitor {
    pub(crate) fn new(nvml: Arc<Nvml>) -> Self {
        Self { nvml: Some(nvml) }
    }
}

impl PerformanceMonitor for NvmlPerformanceMonitor {
    fn metrics(&self, device: &dyn GpuDevice) -> Result<MetricsSnapshot, NativeError> {
        let nvml = live(&self.nvml, "Performance monitor")?;
        let handle = device_by_id(nvml, device.id())?;

        let core = handle
            .temperature(TemperatureSensor::Gpu)
            .map_err(convert_error)?;

        let memory = memory_temperature(
            handle.field_values_for(&[FieldId(field_id::NVML_FI_DEV_MEMORY_TEMP)]),
        );

        let has_fans = handle.num_fans().map(|n| n > 0).unwrap_or(false);
        let (fan_rpm, fan_duty) = if has_fans {
            (
                handle.fan_speed_rpm(0).ok().map(FanRpm::new),
                handle.fan_speed(0).ok().map(FanDuty::saturating),
            )
        } else {
            (None, None)
        };

        Ok(MetricsSnapshot {
            core: Some(Temperature::from(core)),
            // NVML does not expose a junction/hotspot sensor
            hotspot: None,
            memory,
            fan_rpm,
            fan_duty,
        })
    }

    fn start_tracking(
        &mut self,
        _interval: Duration,
    ) -> Result<Box<dyn TrackingSession>, NativeError> {
        Err(NativeError::NotSupported(
            "NVML has no performance tracking sessions".to_string(),
        ))
    }
}

impl Release for NvmlPerformanceMonitor {
    fn release(&mut self) -> Result<(), NativeError> {
        self.nvml = None;
        Ok(())
    }
}

/// Reading of the memory temperature field, `None` when it cannot be read
///
/// Many boards have no memory sensor at all; a failed query of this one
/// channel never fails the whole snapshot.
fn memory_temperature(samples: FieldValues) -> Option<Temperature> {
    let sample = samples.ok()?.into_iter().next()?.ok()?;
    let celsius = match sample.value.ok()? {
        SampleValue::U32(v) => v as f32,
        SampleValue::U64(v) => v as f32,
        SampleValue::I64(v) => v as f32,
        SampleValue::F64(v) => v as f32,
    };
    Some(Temperature::new(celsius))
}

type FieldValues = Result<Vec<Result<FieldValueSample, NvmlError>>, NvmlError>;
