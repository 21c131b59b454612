//! Command handlers
//!
//! Each command handler plays the host: it loads the plugin, drives one
//! lifecycle and closes it again.

pub mod fan;
pub mod list;
pub mod watch;

pub use fan::run_fan;
pub use list::run_list;
pub use watch::run_watch;

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, SensorList};
use crate::config::Config;
use crate::error::Result;
use crate::mock::MockLibrary;
use crate::native::{NativeLibrary, NvmlLibrary};
use crate::plugin::{LifecycleCoordinator, SensorContainer};

use std::time::Duration;

/// Create and initialize the plugin over NVML or the simulated backend
pub fn start_plugin(config: &Config, simulate: bool) -> LifecycleCoordinator {
    let library: Box<dyn NativeLibrary> = if simulate {
        Box::new(MockLibrary::demo())
    } else {
        Box::new(NvmlLibrary::new())
    };

    let mut plugin = LifecycleCoordinator::new(library, config.plugin_options());
    plugin.initialize();
    plugin
}

/// Register the plugin's sensors into a fresh container
pub fn load_sensors(plugin: &LifecycleCoordinator) -> SensorContainer {
    let mut container = SensorContainer::new();
    plugin.register_sensors(&mut container);
    container
}

/// Tick the plugin `ticks` times, printing readings after each refresh
pub fn poll(
    plugin: &mut LifecycleCoordinator,
    container: &SensorContainer,
    ticks: u32,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    for tick in 0..ticks {
        if tick > 0 {
            std::thread::sleep(interval);
        }
        plugin.update();
        print_output(&SensorList::from_container(plugin.name(), container), format)?;
    }
    Ok(())
}
