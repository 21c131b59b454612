//! Mock implementations for testing
//!
//! Provides a scripted native library for unit tests, integration tests and
//! the `--simulate` mode of the CLI. Every acquisition and release is
//! journaled so teardown order can be asserted exactly.

use crate::domain::{DeviceId, FanDuty, MetricsSnapshot};
use crate::error::NativeError;
use crate::native::{
    GpuDevice, ManualFanTuning, NativeConnection, NativeLibrary, PerformanceMonitor, Release,
    SystemServices, TrackingSession, TuningService,
};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A native handle acquisition or release, as recorded by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseEvent {
    TrackingSession,
    FanTuning(DeviceId),
    PerformanceMonitor,
    TuningService,
    Device(DeviceId),
    SystemServices,
    Connection,
}

/// Scripted GPU exposed by the mock library
#[derive(Debug, Clone)]
pub struct MockGpu {
    id: DeviceId,
    name: String,
    tunable: bool,
    metrics: MetricsSnapshot,
    capability_fault: bool,
    metrics_fault: bool,
}

impl MockGpu {
    /// Create a read-only mock GPU with default readings
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            name: name.into(),
            tunable: false,
            metrics: MetricsSnapshot::new(45.0, 52.0, 48.0, 1000)
                .with_fan_duty(FanDuty::saturating(35)),
            capability_fault: false,
            metrics_fault: false,
        }
    }

    /// Builder: allow manual fan tuning
    pub fn tunable(mut self) -> Self {
        self.tunable = true;
        self
    }

    /// Builder: set the readings returned by the performance monitor
    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builder: make the tuning capability query fail
    pub fn with_capability_fault(mut self) -> Self {
        self.capability_fault = true;
        self
    }

    /// Builder: make metrics queries fail
    pub fn with_metrics_fault(mut self) -> Self {
        self.metrics_fault = true;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    gpus: Vec<MockGpu>,
    duties: HashMap<DeviceId, FanDuty>,
    not_ready_remaining: u32,
    system_service_attempts: u32,
    connect_fault: Option<NativeError>,
    devices_fault: Option<NativeError>,
    tracking_supported: bool,
    failing_releases: HashSet<ReleaseEvent>,
    acquired: Vec<ReleaseEvent>,
    released: Vec<ReleaseEvent>,
}

impl MockState {
    fn gpu(&self, id: DeviceId) -> Result<&MockGpu, NativeError> {
        self.gpus
            .iter()
            .find(|g| g.id == id)
            .ok_or(NativeError::DeviceNotFound(id.as_u32()))
    }

    fn gpu_mut(&mut self, id: DeviceId) -> Result<&mut MockGpu, NativeError> {
        self.gpus
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(NativeError::DeviceNotFound(id.as_u32()))
    }

    fn record_release(&mut self, event: ReleaseEvent) -> Result<(), NativeError> {
        self.released.push(event);
        if self.failing_releases.contains(&event) {
            return Err(NativeError::Unknown(format!(
                "injected release failure for {:?}",
                event
            )));
        }
        Ok(())
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock native library
///
/// Clones share state, so a test can keep one clone for inspection while the
/// plugin owns another.
#[derive(Debug, Clone, Default)]
pub struct MockLibrary {
    state: SharedState,
}

impl MockLibrary {
    /// Create a mock library with no GPUs
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock library with two demo GPUs, the first one tunable
    pub fn demo() -> Self {
        Self::new()
            .with_gpu(
                MockGpu::new(0, "Mock GPU 0")
                    .tunable()
                    .with_metrics(
                        MetricsSnapshot::new(60.0, 70.0, 55.0, 1200)
                            .with_fan_duty(FanDuty::saturating(40)),
                    ),
            )
            .with_gpu(
                MockGpu::new(1, "Mock GPU 1")
                    .with_metrics(MetricsSnapshot::new(50.0, 58.0, 45.0, 900)),
            )
    }

    /// Builder: add a GPU
    pub fn with_gpu(self, gpu: MockGpu) -> Self {
        lock(&self.state).gpus.push(gpu);
        self
    }

    /// Builder: report not-ready for the first `attempts` system services requests
    pub fn not_ready_for(self, attempts: u32) -> Self {
        lock(&self.state).not_ready_remaining = attempts;
        self
    }

    /// Builder: make `connect` fail
    pub fn with_connect_fault(self, err: NativeError) -> Self {
        lock(&self.state).connect_fault = Some(err);
        self
    }

    /// Builder: make device enumeration fail
    pub fn with_devices_fault(self, err: NativeError) -> Self {
        lock(&self.state).devices_fault = Some(err);
        self
    }

    /// Builder: support performance tracking sessions
    pub fn with_tracking(self) -> Self {
        lock(&self.state).tracking_supported = true;
        self
    }

    /// Builder: make releasing the given handle fail
    pub fn fail_release(self, event: ReleaseEvent) -> Self {
        lock(&self.state).failing_releases.insert(event);
        self
    }

    /// Replace the readings of a GPU
    pub fn set_metrics(&self, id: u32, metrics: MetricsSnapshot) {
        if let Ok(gpu) = lock(&self.state).gpu_mut(DeviceId::new(id)) {
            gpu.metrics = metrics;
        }
    }

    /// Toggle metrics query failures for a GPU
    pub fn set_metrics_fault(&self, id: u32, fault: bool) {
        if let Ok(gpu) = lock(&self.state).gpu_mut(DeviceId::new(id)) {
            gpu.metrics_fault = fault;
        }
    }

    /// Manual duty currently applied to a GPU, if any
    pub fn manual_duty(&self, id: u32) -> Option<FanDuty> {
        lock(&self.state).duties.get(&DeviceId::new(id)).copied()
    }

    /// Number of system services requests made so far
    pub fn system_service_attempts(&self) -> u32 {
        lock(&self.state).system_service_attempts
    }

    /// Handles released so far, in release order
    pub fn releases(&self) -> Vec<ReleaseEvent> {
        lock(&self.state).released.clone()
    }

    /// Handles acquired but not yet released
    pub fn outstanding(&self) -> Vec<ReleaseEvent> {
        let state = lock(&self.state);
        let mut outstanding = state.acquired.clone();
        for event in &state.released {
            if let Some(pos) = outstanding.iter().position(|e| e == event) {
                outstanding.remove(pos);
            }
        }
        outstanding
    }
}

impl NativeLibrary for MockLibrary {
    fn name(&self) -> &str {
        "Mock"
    }

    fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError> {
        let mut state = lock(&self.state);
        if let Some(err) = state.connect_fault.clone() {
            return Err(err);
        }
        state.acquired.push(ReleaseEvent::Connection);

        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

/// Mock connection
pub struct MockConnection {
    state: SharedState,
    released: bool,
}

impl NativeConnection for MockConnection {
    fn system_services(&mut self) -> Result<Box<dyn SystemServices>, NativeError> {
        if self.released {
            return Err(NativeError::Released("Connection"));
        }
        let mut state = lock(&self.state);
        state.system_service_attempts += 1;
        if state.not_ready_remaining > 0 {
            state.not_ready_remaining -= 1;
            return Err(NativeError::NotReady("mock library starting".to_string()));
        }
        state.acquired.push(ReleaseEvent::SystemServices);

        Ok(Box::new(MockSystemServices {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

impl Release for MockConnection {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        lock(&self.state).record_release(ReleaseEvent::Connection)
    }
}

/// Mock system services
pub struct MockSystemServices {
    state: SharedState,
    released: bool,
}

impl MockSystemServices {
    fn check(&self) -> Result<(), NativeError> {
        if self.released {
            return Err(NativeError::Released("System services"));
        }
        Ok(())
    }
}

impl SystemServices for MockSystemServices {
    fn devices(&mut self) -> Result<Vec<Box<dyn GpuDevice>>, NativeError> {
        self.check()?;
        let mut state = lock(&self.state);
        if let Some(err) = state.devices_fault.clone() {
            return Err(err);
        }

        let devices: Vec<(DeviceId, String)> = state
            .gpus
            .iter()
            .map(|g| (g.id, g.name.clone()))
            .collect();
        state
            .acquired
            .extend(devices.iter().map(|(id, _)| ReleaseEvent::Device(*id)));

        Ok(devices
            .into_iter()
            .map(|(id, name)| {
                Box::new(MockDevice {
                    state: Arc::clone(&self.state),
                    id,
                    name,
                    released: false,
                }) as Box<dyn GpuDevice>
            })
            .collect())
    }

    fn tuning_service(&mut self) -> Result<Box<dyn TuningService>, NativeError> {
        self.check()?;
        lock(&self.state).acquired.push(ReleaseEvent::TuningService);
        Ok(Box::new(MockTuningService {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }

    fn performance_monitor(&mut self) -> Result<Box<dyn PerformanceMonitor>, NativeError> {
        self.check()?;
        lock(&self.state)
            .acquired
            .push(ReleaseEvent::PerformanceMonitor);
        Ok(Box::new(MockPerformanceMonitor {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

impl Release for MockSystemServices {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        lock(&self.state).record_release(ReleaseEvent::SystemServices)
    }
}

/// Mock GPU handle
pub struct MockDevice {
    state: SharedState,
    id: DeviceId,
    name: String,
    released: bool,
}

impl GpuDevice for MockDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Release for MockDevice {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        lock(&self.state).record_release(ReleaseEvent::Device(self.id))
    }
}

/// Mock tuning service
pub struct MockTuningService {
    state: SharedState,
    released: bool,
}

impl TuningService for MockTuningService {
    fn supports_manual_fan_tuning(&self, device: &dyn GpuDevice) -> Result<bool, NativeError> {
        if self.released {
            return Err(NativeError::Released("Tuning service"));
        }
        let state = lock(&self.state);
        let gpu = state.gpu(device.id())?;
        if gpu.capability_fault {
            return Err(NativeError::Unknown(format!(
                "capability query failed for GPU {}",
                gpu.id
            )));
        }
        Ok(gpu.tunable)
    }

    fn manual_fan_tuning(
        &self,
        device: &dyn GpuDevice,
    ) -> Result<Box<dyn ManualFanTuning>, NativeError> {
        if self.released {
            return Err(NativeError::Released("Tuning service"));
        }
        let mut state = lock(&self.state);
        if !state.gpu(device.id())?.tunable {
            return Err(NativeError::NotSupported(
                "Manual fan tuning not supported".to_string(),
            ));
        }
        state.acquired.push(ReleaseEvent::FanTuning(device.id()));

        Ok(Box::new(MockFanTuning {
            state: Arc::clone(&self.state),
            id: device.id(),
            manual: false,
            released: false,
        }))
    }
}

impl Release for MockTuningService {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        lock(&self.state).record_release(ReleaseEvent::TuningService)
    }
}

/// Mock manual fan tuning handle
///
/// Like a real driver handle, releasing it after a manual duty was applied
/// hands the fan back to automatic control.
pub struct MockFanTuning {
    state: SharedState,
    id: DeviceId,
    manual: bool,
    released: bool,
}

impl ManualFanTuning for MockFanTuning {
    fn duty(&self) -> Result<FanDuty, NativeError> {
        if self.released {
            return Err(NativeError::Released("Fan tuning"));
        }
        let state = lock(&self.state);
        let fallback = state.gpu(self.id)?.metrics.fan_duty;
        Ok(state
            .duties
            .get(&self.id)
            .copied()
            .or(fallback)
            .unwrap_or(FanDuty::saturating(0)))
    }

    fn set_duty(&mut self, duty: FanDuty) -> Result<(), NativeError> {
        if self.released {
            return Err(NativeError::Released("Fan tuning"));
        }
        lock(&self.state).duties.insert(self.id, duty);
        self.manual = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), NativeError> {
        if self.released {
            return Err(NativeError::Released("Fan tuning"));
        }
        lock(&self.state).duties.remove(&self.id);
        self.manual = false;
        Ok(())
    }
}

impl Release for MockFanTuning {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        let mut state = lock(&self.state);
        if std::mem::take(&mut self.manual) {
            state.duties.remove(&self.id);
        }
        state.record_release(ReleaseEvent::FanTuning(self.id))
    }
}

/// Mock performance monitor
pub struct MockPerformanceMonitor {
    state: SharedState,
    released: bool,
}

impl PerformanceMonitor for MockPerformanceMonitor {
    fn metrics(&self, device: &dyn GpuDevice) -> Result<MetricsSnapshot, NativeError> {
        if self.released {
            return Err(NativeError::Released("Performance monitor"));
        }
        let state = lock(&self.state);
        let gpu = state.gpu(device.id())?;
        if gpu.metrics_fault {
            return Err(NativeError::Unknown(format!(
                "metrics query failed for GPU {}",
                gpu.id
            )));
        }

        let mut snapshot = gpu.metrics;
        if let Some(duty) = state.duties.get(&gpu.id) {
            snapshot.fan_duty = Some(*duty);
        }
        Ok(snapshot)
    }

    fn start_tracking(
        &mut self,
        _interval: Duration,
    ) -> Result<Box<dyn TrackingSession>, NativeError> {
        if self.released {
            return Err(NativeError::Released("Performance monitor"));
        }
        let mut state = lock(&self.state);
        if !state.tracking_supported {
            return Err(NativeError::NotSupported(
                "Tracking not supported".to_string(),
            ));
        }
        state.acquired.push(ReleaseEvent::TrackingSession);

        Ok(Box::new(MockTrackingSession {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

impl Release for MockPerformanceMonitor {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        lock(&self.state).record_release(ReleaseEvent::PerformanceMonitor)
    }
}

/// Mock tracking session
pub struct MockTrackingSession {
    state: SharedState,
    released: bool,
}

impl TrackingSession for MockTrackingSession {}

impl Release for MockTrackingSession {
    fn release(&mut self) -> Result<(), NativeError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        lock(&self.state).record_release(ReleaseEvent::TrackingSession)
    }
}
