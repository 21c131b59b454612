//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// GPU sensor bridge
///
/// Loads the GPU plugin the way a fan control host does and exposes its
/// sensors and fan controls.
#[derive(Parser, Debug)]
#[command(name = "fanbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FANBRIDGE_CONFIG")]
    pub config: Option<String>,

    /// Use two simulated GPUs instead of the NVIDIA driver
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered sensors and controls
    List,

    /// Poll sensors at the configured interval
    Watch(WatchArgs),

    /// Drive a fan control
    Fan(FanArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Number of refresh ticks before exiting
    #[arg(short, long, default_value = "5")]
    pub ticks: u32,

    /// Tick interval in milliseconds (overrides the config file)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

/// Arguments for fan control commands
#[derive(Parser, Debug)]
pub struct FanArgs {
    #[command(subcommand)]
    pub command: FanCommands,
}

/// Fan subcommands
#[derive(Subcommand, Debug)]
pub enum FanCommands {
    /// Set a fixed fan duty
    Set {
        /// Control id as shown by `list`
        control: String,

        /// Fan duty percentage (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,

        /// Refresh ticks to hold the duty for; the fan returns to automatic
        /// control when fanbridge exits
        #[arg(long, default_value = "10")]
        hold: u32,
    },

    /// Return a fan to automatic control
    Reset {
        /// Control id as shown by `list`
        control: String,
    },
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
