//! Host-facing plugin surface
//!
//! The host framework registers sensors and controls once, polls them at its
//! own cadence, and drives the plugin lifecycle from a single thread.

use crate::error::Result;

/// A sensor the host polls
pub trait PluginSensor: Send + Sync {
    /// Stable identity, unique within the plugin
    fn id(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    /// Latest value, or `None` when unavailable
    fn value(&self) -> Option<f32>;
}

/// A sensor that also accepts a set point
pub trait PluginControlSensor: PluginSensor {
    /// Apply a new value
    fn set(&self, value: f32) -> Result<()>;

    /// Give control back to the device
    fn reset(&self) -> Result<()>;
}

/// Collections the host provides for registration
#[derive(Default)]
pub struct SensorContainer {
    pub control_sensors: Vec<Box<dyn PluginControlSensor>>,
    pub fan_sensors: Vec<Box<dyn PluginSensor>>,
    pub temp_sensors: Vec<Box<dyn PluginSensor>>,
}

impl SensorContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of registered sensors and controls
    pub fn len(&self) -> usize {
        self.control_sensors.len() + self.fan_sensors.len() + self.temp_sensors.len()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a control by id
    pub fn control(&self, id: &str) -> Option<&dyn PluginControlSensor> {
        self.control_sensors
            .iter()
            .find(|c| c.id() == id)
            .map(|c| &**c)
    }
}

/// Lifecycle calls the host makes on a plugin
///
/// None of these fail outward: faults are logged and leave the plugin
/// exposing no sensors.
pub trait Plugin {
    /// Display name identifying the plugin to the host
    fn name(&self) -> &str;

    /// Acquire native resources
    fn initialize(&mut self);

    /// Push sensors and controls into the host's collections
    fn load(&self, container: &mut SensorContainer);

    /// Refresh tick, once per host polling interval
    fn update(&mut self);

    /// Release everything; idempotent
    fn close(&mut self);
}
