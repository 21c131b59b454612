//! Plugin layer
//!
//! The lifecycle coordinator owns native resources; the sensor adapter turns
//! them into records the host registers and polls.

pub mod host;
pub mod lifecycle;
pub mod sensors;

pub use host::{Plugin, PluginControlSensor, PluginSensor, SensorContainer};
pub use lifecycle::{LifecycleCoordinator, PluginOptions};
pub use sensors::{Channel, ControlRecord, SensorRecord, SensorSet};
