//! Amethyst - a configurable web server
//!
//! This is the main entry point for the Amethyst CLI. It loads and validates
//! configuration files; serving is done by the runtime that consumes the
//! loaded configuration.

mod exit_codes;

use amethyst_config::{LoadError, Loaded, Session, TableOrder};
use amethyst_plugin::CatalogLoader;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Amethyst - configurable web server
#[derive(Parser)]
#[command(name = "amethyst")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration file and report every problem found
    Check {
        /// Path to the configuration file
        #[arg(default_value = "amethyst.conf")]
        config: PathBuf,
    },

    /// Print the event handlers a configuration registers
    Events {
        /// Path to the configuration file
        #[arg(default_value = "amethyst.conf")]
        config: PathBuf,

        /// Row order of the table
        #[arg(long, value_enum, default_value_t = Order::Priority)]
        order: Order,
    },

    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Order {
    Id,
    Priority,
    Module,
    Event,
}

impl From<Order> for TableOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Id => TableOrder::Id,
            Order::Priority => TableOrder::Priority,
            Order::Module => TableOrder::Module,
            Order::Event => TableOrder::Event,
        }
    }
}

/// Exit unless running on a supported platform
fn validate_system() {
    if cfg!(target_os = "linux") {
        return;
    }
    eprintln!("error: fatal: This program was not written for your operating system!");
    eprintln!("error: fatal: Expected a Linux system, found {}", amethyst_core::PLATFORM);
    std::process::exit(exit_codes::BAD_ENVIRONMENT);
}

/// Load `path`, exiting with every diagnostic printed if it fails
fn load(path: &Path) -> Loaded {
    tracing::info!("Loading configuration from {}", path.display());
    let session = Session::new(Arc::new(CatalogLoader::bundled()));

    match session.load_file(path) {
        Ok(loaded) => {
            for warning in &loaded.warnings {
                eprintln!("{}", warning);
            }
            loaded
        }
        Err(err) => {
            report(&err);
            std::process::exit(exit_codes::BAD_CONFIG);
        }
    }
}

fn report(err: &LoadError) {
    for diagnostic in err.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    eprintln!("error: fatal: {}", err);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check { config } => {
            let loaded = load(&config);
            let settings = loaded.config.core_settings()?;
            println!("Configuration OK: {}", config.display());
            println!("  modules: {}", loaded.modules.join(", "));
            if let Some(port) = settings.port {
                println!("  port: {}", port);
            }
            println!("  endpoints: {}", settings.endpoints.len());
            println!("  event handlers: {}", loaded.events.len());
        }

        Commands::Events { config, order } => {
            let loaded = load(&config);
            println!("{}", loaded.events.table(order.into()));
        }

        Commands::Version => {
            println!("{} {} ({})", amethyst_core::PRODUCT, amethyst_core::VERSION, amethyst_core::PLATFORM);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // diagnostics are printed directly; the log only mirrors them with -v
    let default_level = if cli.verbose { "debug" } else { "off" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    validate_system();

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        eprintln!("error: fatal: {:#}", e);
        std::process::exit(exit_codes::UNKNOWN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_events_order() {
        let cli = Cli::try_parse_from(["amethyst", "events", "a.conf", "--order", "module"]).unwrap();
        match cli.command {
            Commands::Events { config, order } => {
                assert_eq!(config, PathBuf::from("a.conf"));
                assert!(matches!(TableOrder::from(order), TableOrder::Module));
            }
            _ => panic!("expected events"),
        }
    }
}
