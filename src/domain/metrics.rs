//! Telemetry snapshot type

use crate::domain::{FanDuty, FanRpm, Temperature};
use serde::{Deserialize, Serialize};

/// One complete set of telemetry values captured at a single query instant
///
/// Channels the backend cannot read are `None`. Snapshots are `Copy` and are
/// always replaced as a whole, never mutated field by field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// GPU core temperature
    pub core: Option<Temperature>,
    /// GPU hotspot (junction) temperature
    pub hotspot: Option<Temperature>,
    /// Memory temperature
    pub memory: Option<Temperature>,
    /// Fan speed
    pub fan_rpm: Option<FanRpm>,
    /// Fan duty cycle
    pub fan_duty: Option<FanDuty>,
}

impl MetricsSnapshot {
    /// Create a snapshot with all temperature channels and the fan speed set
    pub fn new(core: f32, hotspot: f32, memory: f32, fan_rpm: u32) -> Self {
        Self {
            core: Some(Temperature::new(core)),
            hotspot: Some(Temperature::new(hotspot)),
            memory: Some(Temperature::new(memory)),
            fan_rpm: Some(FanRpm::new(fan_rpm)),
            fan_duty: None,
        }
    }

    /// Builder: set fan duty
    pub fn with_fan_duty(mut self, duty: FanDuty) -> Self {
        self.fan_duty = Some(duty);
        self
    }
}
