//! Watch command implementation
//!
//! Ticks the plugin at the polling interval, printing readings each tick.

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::commands::{load_sensors, poll, start_plugin};
use crate::config::Config;
use crate::error::Result;

/// Execute the watch command
pub fn run_watch(
    args: &WatchArgs,
    config: &Config,
    format: OutputFormat,
    simulate: bool,
) -> Result<()> {
    let mut plugin = start_plugin(config, simulate);
    let container = load_sensors(&plugin);
    let interval = config.poll_interval();

    log::info!(
        "Watching {} sensor(s) for {} tick(s) every {:?}",
        container.len(),
        args.ticks,
        interval
    );

    poll(&mut plugin, &container, args.ticks, interval, format)?;
    plugin.close();
    Ok(())
}
