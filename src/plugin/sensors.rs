//! Sensor adapter layer
//!
//! Maps resolved devices and their metrics caches to the records the host
//! registers. Records hold no native resources and only weak references to
//! caches and tuning handles, so they go dead as soon as teardown begins.

use crate::domain::{DeviceInfo, FanDuty, MetricsSnapshot};
use crate::error::{PluginError, Result};
use crate::plugin::host::{PluginControlSensor, PluginSensor, SensorContainer};
use crate::services::{DeviceCapability, MetricsCache, TuningCapabilityResolver, WeakFanTuning};

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// Snapshot field a sensor reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Fan,
    Core,
    Hotspot,
    Memory,
}

impl Channel {
    /// Temperature channels in registration order
    pub const TEMPERATURES: [Channel; 3] = [Channel::Hotspot, Channel::Core, Channel::Memory];

    /// Channel label used in ids and names
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Fan => "Fan",
            Channel::Core => "Core",
            Channel::Hotspot => "Hotspot",
            Channel::Memory => "Memory",
        }
    }

    fn read(&self, snapshot: &MetricsSnapshot) -> Option<f32> {
        match self {
            Channel::Fan => snapshot.fan_rpm.map(|rpm| rpm.as_rpm() as f32),
            Channel::Core => snapshot.core.map(f32::from),
            Channel::Hotspot => snapshot.hotspot.map(f32::from),
            Channel::Memory => snapshot.memory.map(f32::from),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only sensor bound to one channel of one device's cache
pub struct SensorRecord {
    id: String,
    name: String,
    device: DeviceInfo,
    channel: Channel,
    cache: Weak<MetricsCache>,
}

impl SensorRecord {
    /// Create a sensor record
    pub fn new(
        prefix: &str,
        device: &DeviceInfo,
        channel: Channel,
        cache: &Arc<MetricsCache>,
    ) -> Self {
        Self {
            id: format!("{}/{}/{}", prefix, device.id, channel),
            name: format!("{} {}", device.name, channel),
            device: device.clone(),
            channel,
            cache: Arc::downgrade(cache),
        }
    }

    /// Device the sensor belongs to
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Channel the sensor reads
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl PluginSensor for SensorRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Option<f32> {
        let cache = self.cache.upgrade()?;
        self.channel.read(&cache.current())
    }
}

/// Fan duty control of one tunable device
///
/// Reads come from the cached snapshot; writes go straight to the tuning
/// handle.
pub struct ControlRecord {
    id: String,
    name: String,
    device: DeviceInfo,
    cache: Weak<MetricsCache>,
    tuning: WeakFanTuning,
}

impl ControlRecord {
    /// Create a control record
    pub fn new(
        prefix: &str,
        device: &DeviceInfo,
        cache: &Arc<MetricsCache>,
        tuning: WeakFanTuning,
    ) -> Self {
        Self {
            id: format!("{}/{}/FanControl", prefix, device.id),
            name: format!("{} Fan Control", device.name),
            device: device.clone(),
            cache: Arc::downgrade(cache),
            tuning,
        }
    }

    /// Device the control drives
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }
}

impl PluginSensor for ControlRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Option<f32> {
        let cache = self.cache.upgrade()?;
        cache
            .current()
            .fan_duty
            .map(|duty| duty.as_percentage() as f32)
    }
}

impl PluginControlSensor for ControlRecord {
    fn set(&self, value: f32) -> Result<()> {
        let duty = FanDuty::from_percent(value)?;
        let tuning = self
            .tuning
            .upgrade()
            .ok_or_else(|| PluginError::SensorReleased(self.id.clone()))?;
        tuning.set_duty(duty)?;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let tuning = self
            .tuning
            .upgrade()
            .ok_or_else(|| PluginError::SensorReleased(self.id.clone()))?;
        tuning.reset()?;
        Ok(())
    }
}

/// Every record the plugin exposes, grouped the way the host registers them
#[derive(Default)]
pub struct SensorSet {
    pub controls: Vec<ControlRecord>,
    pub fans: Vec<SensorRecord>,
    pub temperatures: Vec<SensorRecord>,
}

impl SensorSet {
    /// Build records for every resolved device
    ///
    /// `caches` must be in the same (catalog) order as the resolver.
    pub fn build(
        prefix: &str,
        resolver: &TuningCapabilityResolver,
        caches: &[Arc<MetricsCache>],
    ) -> Self {
        let devices: Vec<_> = resolver.resolved().iter().zip(caches).collect();

        let controls = devices
            .iter()
            .filter_map(|(resolved, cache)| match &resolved.capability {
                DeviceCapability::Tunable(tuning) => Some(ControlRecord::new(
                    prefix,
                    &resolved.info,
                    cache,
                    tuning.downgrade(),
                )),
                DeviceCapability::ReadOnly => None,
            })
            .collect();

        let fans = devices
            .iter()
            .map(|(resolved, cache)| SensorRecord::new(prefix, &resolved.info, Channel::Fan, cache))
            .collect();

        let temperatures = Channel::TEMPERATURES
            .iter()
            .flat_map(|channel| {
                devices.iter().map(move |(resolved, cache)| {
                    SensorRecord::new(prefix, &resolved.info, *channel, cache)
                })
            })
            .collect();

        Self {
            controls,
            fans,
            temperatures,
        }
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.controls.len() + self.fans.len() + self.temperatures.len()
    }

    /// Whether the set holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push every record into the host's collections
    pub fn register(self, container: &mut SensorContainer) {
        for control in self.controls {
            container.control_sensors.push(Box::new(control));
        }
        for fan in self.fans {
            container.fan_sensors.push(Box::new(fan));
        }
        for temp in self.temperatures {
            container.temp_sensors.push(Box::new(temp));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceId, FanRpm, Temperature};
    use crate::mock::{MockGpu, MockLibrary};
    use crate::native::{NativeLibrary, PerformanceMonitor};
    use crate::services::DeviceCatalog;

    struct Fixture {
        resolver: TuningCapabilityResolver,
        caches: Vec<Arc<MetricsCache>>,
        _monitor: Box<dyn PerformanceMonitor>,
    }

    fn fixture(library: &MockLibrary) -> Fixture {
        let mut connection = library.connect().unwrap();
        let mut system = connection.system_services().unwrap();
        let catalog = DeviceCatalog::enumerate(system.as_mut()).unwrap();
        let tuning = system.tuning_service().unwrap();
        let monitor = system.performance_monitor().unwrap();
        let resolver = TuningCapabilityResolver::resolve_all(tuning.as_ref(), &catalog);
        let caches = catalog
            .devices()
            .map(|d| Arc::new(MetricsCache::new(monitor.as_ref(), d).unwrap()))
            .collect();
        Fixture {
            resolver,
            caches,
            _monitor: monitor,
        }
    }

    #[test]
    fn test_channel_reads_snapshot_fields() {
        let snapshot = MetricsSnapshot {
            core: Some(Temperature::new(61.0)),
            hotspot: Some(Temperature::new(72.0)),
            memory: None,
            fan_rpm: Some(FanRpm::new(1500)),
            fan_duty: None,
        };
        assert_eq!(Channel::Core.read(&snapshot), Some(61.0));
        assert_eq!(Channel::Hotspot.read(&snapshot), Some(72.0));
        assert_eq!(Channel::Memory.read(&snapshot), None);
        assert_eq!(Channel::Fan.read(&snapshot), Some(1500.0));
    }

    #[test]
    fn test_build_counts_and_grouping() {
        let fixture = fixture(&MockLibrary::demo());
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);

        assert_eq!(set.controls.len(), 1);
        assert_eq!(set.fans.len(), 2);
        assert_eq!(set.temperatures.len(), 6);
        assert_eq!(set.len(), 9);

        let channels: Vec<Channel> = set.temperatures.iter().map(|t| t.channel()).collect();
        assert_eq!(
            channels,
            vec![
                Channel::Hotspot,
                Channel::Hotspot,
                Channel::Core,
                Channel::Core,
                Channel::Memory,
                Channel::Memory,
            ]
        );
        assert_eq!(set.controls[0].device().id, DeviceId::new(0));
    }

    #[test]
    fn test_identity_format() {
        let fixture = fixture(&MockLibrary::demo());
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);

        assert_eq!(set.fans[1].id(), "Mock/1/Fan");
        assert_eq!(set.fans[1].name(), "Mock GPU 1 Fan");
        assert_eq!(set.temperatures[0].id(), "Mock/0/Hotspot");
        assert_eq!(set.controls[0].id(), "Mock/0/FanControl");
    }

    #[test]
    fn test_sensor_values_come_from_cache() {
        let library = MockLibrary::demo();
        let fixture = fixture(&library);
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);

        assert_eq!(set.fans[0].value(), Some(1200.0));
        library.set_metrics(0, MetricsSnapshot::new(90.0, 95.0, 80.0, 3000));
        // No refresh has happened, the sensor keeps the cached value
        assert_eq!(set.fans[0].value(), Some(1200.0));
    }

    #[test]
    fn test_control_set_and_reset() {
        let library = MockLibrary::demo();
        let fixture = fixture(&library);
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);
        let control = &set.controls[0];

        assert_eq!(control.value(), Some(40.0));
        control.set(72.4).unwrap();
        assert_eq!(library.manual_duty(0), Some(FanDuty::new(72).unwrap()));

        control.reset().unwrap();
        assert_eq!(library.manual_duty(0), None);
    }

    #[test]
    fn test_control_rejects_invalid_duty() {
        let library = MockLibrary::demo();
        let fixture = fixture(&library);
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);

        assert!(matches!(
            set.controls[0].set(150.0),
            Err(PluginError::Domain(_))
        ));
        assert_eq!(library.manual_duty(0), None);
    }

    #[test]
    fn test_records_go_dead_after_owners_drop() {
        let library = MockLibrary::new().with_gpu(MockGpu::new(0, "GPU").tunable());
        let mut fixture = fixture(&library);
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);

        fixture.caches.clear();
        fixture.resolver.release_all();

        assert_eq!(set.fans[0].value(), None);
        assert_eq!(set.controls[0].value(), None);
        assert!(matches!(
            set.controls[0].set(50.0),
            Err(PluginError::SensorReleased(_))
        ));
    }

    #[test]
    fn test_register_pushes_into_container() {
        let fixture = fixture(&MockLibrary::demo());
        let set = SensorSet::build("Mock", &fixture.resolver, &fixture.caches);
        let mut container = SensorContainer::new();

        set.register(&mut container);

        assert_eq!(container.control_sensors.len(), 1);
        assert_eq!(container.fan_sensors.len(), 2);
        assert_eq!(container.temp_sensors.len(), 6);
        assert!(container.control("Mock/0/FanControl").is_some());
        assert!(container.control("Mock/1/FanControl").is_none());
    }
}
