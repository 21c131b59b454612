//! fanbridge - GPU sensor bridge
//!
//! A small host that loads the GPU plugin, lists and polls its sensors and
//! drives its fan controls.

use clap::Parser;
use fanbridge::cli::args::{generate_completions, Cli, Commands};
use fanbridge::commands::{run_fan, run_list, run_watch};
use fanbridge::config::ConfigBuilder;
use fanbridge::error::{ConfigError, NativeError, PluginError};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let result = run(&cli);

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), PluginError> {
    if let Commands::Completions { shell } = &cli.command {
        generate_completions(*shell);
        return Ok(());
    }

    let config = ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .with_poll_interval_ms(match &cli.command {
            Commands::Watch(args) => args.interval_ms,
            _ => None,
        })
        .build();

    // Set log level based on verbose flag
    if config.general.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    match &cli.command {
        Commands::List => run_list(&config, cli.format, cli.simulate),

        Commands::Watch(args) => run_watch(args, &config, cli.format, cli.simulate),

        Commands::Fan(args) => run_fan(args, &config, cli.format, cli.simulate),

        Commands::Completions { .. } => Ok(()),
    }
}

fn print_error(err: &PluginError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        PluginError::Native(NativeError::LibraryNotFound) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      Use --simulate to try fanbridge without a GPU.");
        }
        PluginError::Native(NativeError::InsufficientPermissions(_)) => {
            eprintln!();
            eprintln!("Hint: Try running with sudo or as root.");
        }
        PluginError::NotOperational => {
            eprintln!();
            eprintln!("Hint: Run with --verbose to see why the GPU library failed to start.");
        }
        PluginError::ControlNotFound(_) => {
            eprintln!();
            eprintln!("Hint: Run 'fanbridge list' to see available control ids.");
        }
        PluginError::Config(ConfigError::FileNotFound(_)) => {
            eprintln!();
            eprintln!("Hint: Check the --config path or FANBRIDGE_CONFIG.");
        }
        _ => {}
    }
}
