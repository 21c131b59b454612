//! Plugin lifecycle coordination
//!
//! Owns every native handle the plugin acquires and sequences initialization,
//! refresh ticks and teardown. The plugin is either fully operational or holds
//! nothing: any initialization failure releases what was acquired so far.

use crate::domain::{DeviceId, DeviceInfo, MetricsSnapshot};
use crate::error::Result;
use crate::native::{
    NativeConnection, NativeLibrary, PerformanceMonitor, Release, SystemServices, TrackingSession,
    TuningService,
};
use crate::plugin::host::{Plugin, SensorContainer};
use crate::plugin::sensors::SensorSet;
use crate::services::{
    DeviceCatalog, MetricsCache, RetryPolicy, Sleeper, ThreadSleeper, TuningCapabilityResolver,
};

use std::sync::Arc;
use std::time::Duration;

/// Startup options of the plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PluginOptions {
    /// Readiness retry budget
    pub retry: RetryPolicy,
    /// Start a performance tracking session at this interval
    pub tracking_interval: Option<Duration>,
}

/// Native handles held while operational, in acquisition order
#[derive(Default)]
struct NativeResources {
    connection: Option<Box<dyn NativeConnection>>,
    system: Option<Box<dyn SystemServices>>,
    catalog: DeviceCatalog,
    tuning: Option<Box<dyn TuningService>>,
    monitor: Option<Box<dyn PerformanceMonitor>>,
    fans: TuningCapabilityResolver,
    tracking: Option<Box<dyn TrackingSession>>,
    caches: Vec<Arc<MetricsCache>>,
}

impl NativeResources {
    /// Release everything held, dependents before the handles they came from
    ///
    /// Absent handles are skipped and failures are logged; every step runs.
    /// Returns the number of handles that failed to release.
    fn release_all(&mut self, plugin: &str) -> usize {
        // Dropping the caches turns every registered sensor dead
        self.caches.clear();

        let mut failures = 0;
        failures += release_one(plugin, "tracking session", self.tracking.take());
        failures += self.fans.release_all();
        failures += release_one(plugin, "performance monitor", self.monitor.take());
        failures += release_one(plugin, "tuning service", self.tuning.take());
        failures += self.catalog.release_all();
        failures += release_one(plugin, "system services", self.system.take());
        failures += release_one(plugin, "connection", self.connection.take());
        failures
    }
}

fn release_one<R>(plugin: &str, what: &str, handle: Option<Box<R>>) -> usize
where
    R: Release + ?Sized,
{
    let Some(mut handle) = handle else {
        return 0;
    };
    match handle.release() {
        Ok(()) => 0,
        Err(e) => {
            log::warn!("{} plugin: Failed to release {}: {}", plugin, what, e);
            1
        }
    }
}

/// Drives the plugin through initialize, update and close
///
/// All calls come from the host's single plugin thread. Sensor reads may come
/// from any thread and only ever touch the metrics caches.
pub struct LifecycleCoordinator {
    library: Box<dyn NativeLibrary>,
    options: PluginOptions,
    sleeper: Box<dyn Sleeper>,
    resources: NativeResources,
    operational: bool,
}

impl LifecycleCoordinator {
    /// Create a coordinator for a native library
    pub fn new(library: Box<dyn NativeLibrary>, options: PluginOptions) -> Self {
        Self {
            library,
            options,
            sleeper: Box::new(ThreadSleeper),
            resources: NativeResources::default(),
            operational: false,
        }
    }

    /// Builder: replace the sleeper used between readiness attempts
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Display name, taken from the native library
    pub fn name(&self) -> &str {
        self.library.name()
    }

    /// Whether initialization completed and close has not been called
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Acquire the native library and build per-device state
    ///
    /// Never fails outward: on any fault the error is logged, partial state is
    /// released and the plugin stays non-operational.
    pub fn initialize(&mut self) {
        let name = self.name().to_string();
        if self.operational {
            log::info!("{} plugin: Already initialized", name);
            return;
        }

        log::info!("{} plugin: Initializing", name);
        match self.try_initialize(&name) {
            Ok(retries) => {
                self.operational = true;
                log::info!(
                    "{} plugin: Initialized with {} GPU(s), {} tunable, after {} retries",
                    name,
                    self.resources.catalog.len(),
                    self.resources.fans.tunable_count(),
                    retries
                );
            }
            Err(e) => {
                log::error!("{} plugin: Initialization failed: {}", name, e);
                self.resources.release_all(&name);
            }
        }
    }

    fn try_initialize(&mut self, name: &str) -> Result<u32> {
        let res = &mut self.resources;

        let connection = res.connection.insert(self.library.connect()?);
        let (system, retries) = self
            .options
            .retry
            .run(name, &*self.sleeper, || connection.system_services())?;
        let system = res.system.insert(system);

        res.catalog = DeviceCatalog::enumerate(&mut **system)?;
        let tuning = res.tuning.insert(system.tuning_service()?);
        let monitor = res.monitor.insert(system.performance_monitor()?);
        res.fans = TuningCapabilityResolver::resolve_all(&**tuning, &res.catalog);

        if let Some(interval) = self.options.tracking_interval {
            match monitor.start_tracking(interval) {
                Ok(session) => res.tracking = Some(session),
                Err(e) => log::warn!(
                    "{} plugin: Performance tracking unavailable, continuing without: {}",
                    name,
                    e
                ),
            }
        }

        for device in res.catalog.devices() {
            let cache = MetricsCache::new(&**monitor, device)?;
            res.caches.push(Arc::new(cache));
        }

        Ok(retries)
    }

    /// Build the sensor records for every device
    ///
    /// Empty unless operational.
    pub fn build_sensor_set(&self) -> SensorSet {
        if !self.operational {
            return SensorSet::default();
        }
        SensorSet::build(self.name(), &self.resources.fans, &self.resources.caches)
    }

    /// Register sensors and controls with the host
    pub fn register_sensors(&self, container: &mut SensorContainer) {
        let set = self.build_sensor_set();
        log::info!(
            "{} plugin: Registering {} control(s), {} fan sensor(s), {} temperature sensor(s)",
            self.name(),
            set.controls.len(),
            set.fans.len(),
            set.temperatures.len()
        );
        set.register(container);
    }

    /// Refresh every device's cached snapshot
    ///
    /// A device that fails to refresh keeps its previous snapshot. Returns the
    /// number of devices that failed.
    pub fn update(&mut self) -> usize {
        if !self.operational {
            return 0;
        }
        let res = &self.resources;
        let Some(monitor) = res.monitor.as_deref() else {
            return 0;
        };

        let mut failures = 0;
        for (device, cache) in res.catalog.devices().zip(&res.caches) {
            if let Err(e) = cache.refresh(monitor, device) {
                log::warn!(
                    "{} plugin: Failed to refresh GPU {}: {}",
                    self.library.name(),
                    device.id(),
                    e
                );
                failures += 1;
            }
        }
        failures
    }

    /// Release every native handle
    ///
    /// Safe to call any number of times, including before initialize.
    pub fn close(&mut self) {
        if !self.operational {
            return;
        }
        let name = self.name().to_string();
        log::info!("{} plugin: Closing", name);

        self.operational = false;
        let failures = self.resources.release_all(&name);
        if failures > 0 {
            log::warn!("{} plugin: {} handle(s) failed to release", name, failures);
        }
    }

    /// Identification of every enumerated device
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.resources.catalog.infos()
    }

    /// Cached snapshot of one device
    pub fn snapshot(&self, id: DeviceId) -> Option<MetricsSnapshot> {
        self.resources
            .caches
            .iter()
            .find(|c| c.device() == id)
            .map(|c| c.current())
    }
}

impl Plugin for LifecycleCoordinator {
    fn name(&self) -> &str {
        LifecycleCoordinator::name(self)
    }

    fn initialize(&mut self) {
        LifecycleCoordinator::initialize(self);
    }

    fn load(&self, container: &mut SensorContainer) {
        self.register_sensors(container);
    }

    fn update(&mut self) {
        LifecycleCoordinator::update(self);
    }

    fn close(&mut self) {
        LifecycleCoordinator::close(self);
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FanDuty;
    use crate::error::NativeError;
    use crate::mock::{MockGpu, MockLibrary, ReleaseEvent};
    use crate::services::retry::testing::{capture_logs, captured, RecordingSleeper};

    fn coordinator(library: &MockLibrary) -> (LifecycleCoordinator, RecordingSleeper) {
        let sleeper = RecordingSleeper::default();
        let coordinator =
            LifecycleCoordinator::new(Box::new(library.clone()), PluginOptions::default())
                .with_sleeper(Box::new(sleeper.clone()));
        (coordinator, sleeper)
    }

    #[test]
    fn test_initialize_success() {
        let library = MockLibrary::demo();
        let (mut plugin, sleeper) = coordinator(&library);

        plugin.initialize();

        assert!(plugin.is_operational());
        assert_eq!(plugin.devices().len(), 2);
        assert_eq!(sleeper.count(), 0);
        assert_eq!(
            plugin.snapshot(DeviceId::new(1)),
            Some(MetricsSnapshot::new(50.0, 58.0, 45.0, 900))
        );
    }

    #[test]
    fn test_initialize_retries_until_ready() {
        let library = MockLibrary::demo().not_ready_for(3);
        let (mut plugin, sleeper) = coordinator(&library);

        plugin.initialize();

        assert!(plugin.is_operational());
        assert_eq!(library.system_service_attempts(), 4);
        assert_eq!(sleeper.count(), 3);
    }

    #[test]
    fn test_initialize_gives_up_and_releases_connection() {
        let library = MockLibrary::demo().not_ready_for(5);
        let (mut plugin, sleeper) = coordinator(&library);

        plugin.initialize();

        assert!(!plugin.is_operational());
        assert_eq!(library.system_service_attempts(), 5);
        assert_eq!(sleeper.count(), 4);
        assert_eq!(library.releases(), vec![ReleaseEvent::Connection]);
        assert!(library.outstanding().is_empty());
    }

    #[test]
    fn test_connect_fault_is_not_retried() {
        let library = MockLibrary::demo().with_connect_fault(NativeError::LibraryNotFound);
        let (mut plugin, sleeper) = coordinator(&library);

        plugin.initialize();

        assert!(!plugin.is_operational());
        assert_eq!(library.system_service_attempts(), 0);
        assert_eq!(sleeper.count(), 0);
        assert!(plugin.build_sensor_set().is_empty());
    }

    #[test]
    fn test_enumeration_fault_releases_partial_state() {
        let library = MockLibrary::demo().with_devices_fault(NativeError::GpuLost);
        let (mut plugin, _) = coordinator(&library);

        plugin.initialize();

        assert!(!plugin.is_operational());
        assert_eq!(
            library.releases(),
            vec![ReleaseEvent::SystemServices, ReleaseEvent::Connection]
        );
        assert!(library.outstanding().is_empty());
    }

    #[test]
    fn test_initial_metrics_fault_is_fatal() {
        let library = MockLibrary::new()
            .with_gpu(MockGpu::new(0, "GPU").tunable().with_metrics_fault());
        let (mut plugin, _) = coordinator(&library);

        plugin.initialize();

        assert!(!plugin.is_operational());
        assert_eq!(
            library.releases(),
            vec![
                ReleaseEvent::FanTuning(DeviceId::new(0)),
                ReleaseEvent::PerformanceMonitor,
                ReleaseEvent::TuningService,
                ReleaseEvent::Device(DeviceId::new(0)),
                ReleaseEvent::SystemServices,
                ReleaseEvent::Connection,
            ]
        );
        assert!(library.outstanding().is_empty());
    }

    #[test]
    fn test_second_initialize_is_noop() {
        let library = MockLibrary::demo();
        let (mut plugin, _) = coordinator(&library);

        plugin.initialize();
        plugin.initialize();

        assert!(plugin.is_operational());
        assert_eq!(library.system_service_attempts(), 1);
    }

    #[test]
    fn test_update_refreshes_and_tolerates_faults() {
        let library = MockLibrary::demo();
        let (mut plugin, _) = coordinator(&library);
        plugin.initialize();

        library.set_metrics(0, MetricsSnapshot::new(80.0, 90.0, 70.0, 2500));
        library.set_metrics(1, MetricsSnapshot::new(66.0, 77.0, 55.0, 1800));
        library.set_metrics_fault(1, true);

        assert_eq!(plugin.update(), 1);
        assert_eq!(
            plugin.snapshot(DeviceId::new(0)),
            Some(MetricsSnapshot::new(80.0, 90.0, 70.0, 2500))
        );
        assert_eq!(
            plugin.snapshot(DeviceId::new(1)),
            Some(MetricsSnapshot::new(50.0, 58.0, 45.0, 900))
        );
    }

    #[test]
    fn test_update_before_initialize_is_noop() {
        let library = MockLibrary::demo();
        let (mut plugin, _) = coordinator(&library);

        assert_eq!(plugin.update(), 0);
        assert_eq!(library.system_service_attempts(), 0);
    }

    #[test]
    fn test_close_releases_in_order() {
        let library = MockLibrary::demo().with_tracking();
        let sleeper = RecordingSleeper::default();
        let options = PluginOptions {
            tracking_interval: Some(Duration::from_millis(500)),
            ..PluginOptions::default()
        };
        let mut plugin = LifecycleCoordinator::new(Box::new(library.clone()), options)
            .with_sleeper(Box::new(sleeper));

        plugin.initialize();
        plugin.close();

        assert_eq!(
            library.releases(),
            vec![
                ReleaseEvent::TrackingSession,
                ReleaseEvent::FanTuning(DeviceId::new(0)),
                ReleaseEvent::PerformanceMonitor,
                ReleaseEvent::TuningService,
                ReleaseEvent::Device(DeviceId::new(0)),
                ReleaseEvent::Device(DeviceId::new(1)),
                ReleaseEvent::SystemServices,
                ReleaseEvent::Connection,
            ]
        );
        assert!(library.outstanding().is_empty());
    }

    #[test]
    fn test_tracking_failure_is_not_fatal() {
        let library = MockLibrary::demo();
        let options = PluginOptions {
            tracking_interval: Some(Duration::from_millis(500)),
            ..PluginOptions::default()
        };
        let mut plugin = LifecycleCoordinator::new(Box::new(library.clone()), options)
            .with_sleeper(Box::new(RecordingSleeper::default()));
        capture_logs();

        plugin.initialize();

        assert!(plugin.is_operational());
        let lines = captured("Performance tracking unavailable");
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| l.starts_with("Mock plugin: ")));
    }

    #[test]
    fn test_close_twice_releases_once() {
        let library = MockLibrary::demo();
        let (mut plugin, _) = coordinator(&library);
        plugin.initialize();

        plugin.close();
        let after_first = library.releases();
        plugin.close();

        assert_eq!(library.releases(), after_first);
        assert!(!plugin.is_operational());
    }

    #[test]
    fn test_close_continues_past_release_faults() {
        let library = MockLibrary::demo()
            .fail_release(ReleaseEvent::PerformanceMonitor)
            .fail_release(ReleaseEvent::Device(DeviceId::new(0)));
        let (mut plugin, _) = coordinator(&library);
        plugin.initialize();

        plugin.close();

        assert!(library.releases().contains(&ReleaseEvent::Connection));
        assert_eq!(library.releases().len(), 7);
    }

    #[test]
    fn test_sensors_go_dead_after_close() {
        let library = MockLibrary::demo();
        let (mut plugin, _) = coordinator(&library);
        plugin.initialize();
        let mut container = SensorContainer::new();
        plugin.register_sensors(&mut container);
        assert_eq!(container.temp_sensors[0].value(), Some(70.0));

        plugin.close();

        assert_eq!(container.temp_sensors[0].value(), None);
        assert!(container.control_sensors[0].set(50.0).is_err());
        assert!(plugin.build_sensor_set().is_empty());
    }

    #[test]
    fn test_control_write_reaches_device_and_next_update() {
        let library = MockLibrary::demo();
        let (mut plugin, _) = coordinator(&library);
        plugin.initialize();
        let mut container = SensorContainer::new();
        plugin.register_sensors(&mut container);

        let control = container.control("Mock/0/FanControl").unwrap();
        control.set(55.0).unwrap();
        assert_eq!(library.manual_duty(0), Some(FanDuty::new(55).unwrap()));
        assert_eq!(control.value(), Some(40.0));

        plugin.update();
        assert_eq!(control.value(), Some(55.0));

        plugin.close();
        assert_eq!(library.manual_duty(0), None);
    }

    #[test]
    fn test_drop_closes() {
        let library = MockLibrary::demo();
        {
            let (mut plugin, _) = coordinator(&library);
            plugin.initialize();
        }
        assert!(library.outstanding().is_empty());
    }
}
