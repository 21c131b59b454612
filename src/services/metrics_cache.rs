//! Per-device telemetry cache
//!
//! Decouples the host's polling cadence from native query cost: sensor reads
//! are lookups into the last snapshot, only `refresh` talks to the library.

use crate::domain::{DeviceId, MetricsSnapshot};
use crate::error::NativeError;
use crate::native::{GpuDevice, PerformanceMonitor};

use std::sync::{PoisonError, RwLock};

/// Last successfully captured snapshot of one GPU
///
/// Snapshots are swapped as whole values under the lock, so a reader on any
/// thread sees either the previous or the new snapshot, never a mix.
#[derive(Debug)]
pub struct MetricsCache {
    device: DeviceId,
    snapshot: RwLock<MetricsSnapshot>,
}

impl MetricsCache {
    /// Create the cache with an initial snapshot
    ///
    /// # Errors
    /// Fails if the device cannot be queried right now.
    pub fn new(
        monitor: &dyn PerformanceMonitor,
        device: &dyn GpuDevice,
    ) -> Result<Self, NativeError> {
        let snapshot = monitor.metrics(device)?;
        Ok(Self {
            device: device.id(),
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Re-query the device and replace the cached snapshot
    ///
    /// On failure the previous snapshot stays in place.
    pub fn refresh(
        &self,
        monitor: &dyn PerformanceMonitor,
        device: &dyn GpuDevice,
    ) -> Result<(), NativeError> {
        debug_assert_eq!(device.id(), self.device);

        // Query outside the lock so readers never wait on the library
        let snapshot = monitor.metrics(device)?;
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        Ok(())
    }

    /// The last cached snapshot
    pub fn current(&self) -> MetricsSnapshot {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Device this cache belongs to
    pub fn device(&self) -> DeviceId {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockGpu, MockLibrary};
    use crate::native::{NativeLibrary, SystemServices};

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn uniform(value: f32) -> MetricsSnapshot {
        MetricsSnapshot::new(value, value, value, value as u32)
    }

    fn open(library: &MockLibrary) -> Box<dyn SystemServices> {
        library.connect().unwrap().system_services().unwrap()
    }

    #[test]
    fn test_construction_takes_snapshot() {
        let library =
            MockLibrary::new().with_gpu(MockGpu::new(0, "GPU").with_metrics(uniform(42.0)));
        let mut system = open(&library);
        let devices = system.devices().unwrap();
        let monitor = system.performance_monitor().unwrap();

        let cache = MetricsCache::new(monitor.as_ref(), devices[0].as_ref()).unwrap();
        assert_eq!(cache.current(), uniform(42.0));
        assert_eq!(cache.device(), DeviceId::new(0));
    }

    #[test]
    fn test_construction_fails_fast() {
        let library = MockLibrary::new().with_gpu(MockGpu::new(0, "GPU").with_metrics_fault());
        let mut system = open(&library);
        let devices = system.devices().unwrap();
        let monitor = system.performance_monitor().unwrap();

        assert!(MetricsCache::new(monitor.as_ref(), devices[0].as_ref()).is_err());
    }

    #[test]
    fn test_refresh_replaces_snapshot() {
        let library =
            MockLibrary::new().with_gpu(MockGpu::new(0, "GPU").with_metrics(uniform(40.0)));
        let mut system = open(&library);
        let devices = system.devices().unwrap();
        let monitor = system.performance_monitor().unwrap();
        let cache = MetricsCache::new(monitor.as_ref(), devices[0].as_ref()).unwrap();

        library.set_metrics(0, uniform(70.0));
        // Reads stay on the cached value until refresh
        assert_eq!(cache.current(), uniform(40.0));

        cache.refresh(monitor.as_ref(), devices[0].as_ref()).unwrap();
        assert_eq!(cache.current(), uniform(70.0));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let library =
            MockLibrary::new().with_gpu(MockGpu::new(0, "GPU").with_metrics(uniform(40.0)));
        let mut system = open(&library);
        let devices = system.devices().unwrap();
        let monitor = system.performance_monitor().unwrap();
        let cache = MetricsCache::new(monitor.as_ref(), devices[0].as_ref()).unwrap();

        library.set_metrics(0, uniform(90.0));
        library.set_metrics_fault(0, true);

        assert!(cache.refresh(monitor.as_ref(), devices[0].as_ref()).is_err());
        assert_eq!(cache.current(), uniform(40.0));
    }

    #[test]
    fn test_readers_never_observe_mixed_snapshots() {
        let library =
            MockLibrary::new().with_gpu(MockGpu::new(0, "GPU").with_metrics(uniform(10.0)));
        let mut system = open(&library);
        let devices = system.devices().unwrap();
        let monitor = system.performance_monitor().unwrap();
        let cache = Arc::new(MetricsCache::new(monitor.as_ref(), devices[0].as_ref()).unwrap());
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut reads = 0u32;
                while !done.load(Ordering::Relaxed) || reads == 0 {
                    let snapshot = cache.current();
                    assert!(snapshot == uniform(10.0) || snapshot == uniform(20.0));
                    reads += 1;
                }
                reads
            })
        };

        for i in 0..2000 {
            let value = if i % 2 == 0 { 20.0 } else { 10.0 };
            library.set_metrics(0, uniform(value));
            cache.refresh(monitor.as_ref(), devices[0].as_ref()).unwrap();
        }
        done.store(true, Ordering::Relaxed);

        assert!(reader.join().unwrap() > 0);
    }
}
