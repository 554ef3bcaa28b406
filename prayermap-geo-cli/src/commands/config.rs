//! Configuration management CLI commands.
//!
//! Provides `config show`, `config init`, and `config path`.

use std::path::Path;

use clap::Subcommand;
use prayermap_geo::config::ConfigFile;

use super::common::{config_path, load_config};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(path),
        ConfigCommands::Init { force } => run_init(path, force),
        ConfigCommands::Path => {
            println!("{}", config_path(path).display());
            Ok(())
        }
    }
}

fn run_show(path: Option<&Path>) -> Result<(), CliError> {
    let file = config_path(path);
    let config = load_config(path)?;

    if file.exists() {
        println!("; Loaded from {}", file.display());
    } else {
        println!("; {} not found, showing defaults", file.display());
    }
    print!("{}", config.to_ini_string());
    Ok(())
}

fn run_init(path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let file = config_path(path);
    if file.exists() && !force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            file.display()
        )));
    }
    ConfigFile::default().save_to(&file)?;
    println!("Wrote {}", file.display());
    Ok(())
}
