//! List command implementation
//!
//! Lists every sensor and control the plugin registers.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, SensorList};
use crate::commands::{load_sensors, start_plugin};
use crate::config::Config;
use crate::error::Result;

/// Execute the list command
pub fn run_list(config: &Config, format: OutputFormat, simulate: bool) -> Result<()> {
    let mut plugin = start_plugin(config, simulate);
    let container = load_sensors(&plugin);

    let list = SensorList::from_container(plugin.name(), &container);
    print_output(&list, format)?;

    plugin.close();
    Ok(())
}
