use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use debforge_config::{Config, ConfigError, ConfigLoader};
use debforge_control::ControlError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

mod commands;
mod telemetry;

/// Debian source package tooling for multi-package repositories.
///
/// Reads the packages under the configured package root, brings their debian/
/// directories up to date with each package.toml, and works out the order in
/// which they must be built.
///
/// EXAMPLES:
///     debforge order                    Print the build order per distribution
///     debforge order --parallel         Group packages into concurrent waves
///     debforge check                    Validate every package
///     debforge check -d bullseye        Validate for one distribution
///
/// ENVIRONMENT VARIABLES:
///     DEBFORGE_DISTRIBUTIONS   Comma separated codenames, overrides debforge.toml
///     DEBFORGE_ARCHITECTURE    Target architecture
///     DEBFORGE_NETWORK_ACCESS  Allow network access during builds
///     DEBFORGE_JSON            Set to '1' for JSON output by default
///     RUST_LOG                 Log filter, e.g. 'debforge_control=debug'
#[derive(Parser)]
#[command(name = "debforge")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output results and logs as JSON
    #[arg(long, global = true, env = "DEBFORGE_JSON")]
    json: bool,

    /// Path to debforge.toml (default: searched upwards from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the order in which packages must be built
    ///
    /// Packages come after the packages producing their build dependencies.
    /// Packages that are ready at the same time keep their directory order.
    ///
    /// EXAMPLES:
    ///     debforge order                  One line per distribution
    ///     debforge order --parallel       Waves that can build concurrently
    ///     debforge order --json           Machine readable output
    Order {
        /// Only this distribution
        #[arg(long, short = 'd')]
        distribution: Option<String>,
        /// Group packages into waves that can be built concurrently
        #[arg(long, short = 'p')]
        parallel: bool,
    },

    /// Load every package with all static checks enabled
    ///
    /// EXAMPLES:
    ///     debforge check                  Check all distributions
    ///     debforge check -d focal         Check one distribution
    Check {
        /// Only this distribution
        #[arg(long, short = 'd')]
        distribution: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.json, level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            if is_unexpected(&err) {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Order {
            distribution,
            parallel,
        } => commands::order::run(&config, distribution.as_deref(), parallel, cli.json),
        Commands::Check { distribution } => {
            commands::check::run(&config, distribution.as_deref(), cli.json)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let loader = ConfigLoader::new();
    match path {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            loader
                .load_from_directory(&cwd)
                .context("Failed to load configuration")
        }
    }
}

/// Internal errors exit with 2, configuration errors with 1
fn is_unexpected(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ConfigError>()
            .is_some_and(ConfigError::is_unexpected)
            || cause
                .downcast_ref::<ControlError>()
                .is_some_and(ControlError::is_unexpected)
    })
}
