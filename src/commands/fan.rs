//! Fan command implementation
//!
//! Drives a single fan control the way the host does. A set duty lasts only
//! while the plugin is open: closing it returns the fan to automatic control,
//! so `fan set` keeps polling for `--hold` ticks before exiting.

use crate::cli::args::{FanArgs, FanCommands, OutputFormat};
use crate::cli::output::{print_output, Message};
use crate::commands::{load_sensors, poll, start_plugin};
use crate::config::Config;
use crate::error::{PluginError, Result};
use crate::plugin::{PluginControlSensor, SensorContainer};

/// Execute fan commands
pub fn run_fan(
    args: &FanArgs,
    config: &Config,
    format: OutputFormat,
    simulate: bool,
) -> Result<()> {
    let mut plugin = start_plugin(config, simulate);
    if !plugin.is_operational() {
        return Err(PluginError::NotOperational);
    }
    let container = load_sensors(&plugin);

    print_output(&apply(&args.command, &container)?, format)?;
    if let FanCommands::Set { hold, .. } = &args.command {
        log::info!("Holding fan duty for {} tick(s)", hold);
        poll(&mut plugin, &container, *hold, config.poll_interval(), format)?;
    }

    plugin.close();
    Ok(())
}

fn apply(command: &FanCommands, container: &SensorContainer) -> Result<Message> {
    match command {
        FanCommands::Set {
            control,
            percent,
            hold,
        } => {
            let sensor = find_control(container, control)?;
            sensor.set(f32::from(*percent))?;
            Ok(Message {
                message: format!(
                    "{} set to {}% for {} tick(s), automatic control on exit",
                    sensor.name(),
                    percent,
                    hold
                ),
                success: true,
            })
        }
        FanCommands::Reset { control } => {
            let sensor = find_control(container, control)?;
            sensor.reset()?;
            Ok(Message {
                message: format!("{} returned to automatic control", sensor.name()),
                success: true,
            })
        }
    }
}

fn find_control<'a>(
    container: &'a SensorContainer,
    id: &str,
) -> Result<&'a dyn PluginControlSensor> {
    container
        .control(id)
        .ok_or_else(|| PluginError::ControlNotFound(id.to_string()))
}
