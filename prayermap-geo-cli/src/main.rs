//! PrayerMap Geo CLI
//!
//! Inspects hierarchy resolution and source planning, and fetches boundaries
//! from the live providers with the same pacing the map uses.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::resolve::ResolveArgs;
use commands::sources::SourcesArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "prayermap-geo")]
#[command(version, about = "Boundary acquisition for the prayer map", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.prayermap-geo/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the hierarchy level for a viewport
    Resolve(ResolveArgs),

    /// Show which sources would be tried for a zoom level
    Sources(SourcesArgs),

    /// Fetch boundaries from the live providers
    Fetch(FetchArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Resolve(args) => commands::resolve::run(args, config),
        Commands::Sources(args) => commands::sources::run(args, config),
        Commands::Fetch(args) => commands::fetch::run(args, config),
        Commands::Config(command) => commands::config::run(command, config),
    }
}
