//! CLI error handling with user-friendly messages.
//!
//! Centralizes error reporting for the CLI so every command exits the same
//! way.

use std::fmt;
use std::io;
use std::process;

use prayermap_geo::acquisition::AcquisitionError;
use prayermap_geo::config::ConfigFileError;
use prayermap_geo::gateway::GatewayError;
use prayermap_geo::source::FetchError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Bad command-line argument
    InvalidArgument(String),
    /// Entity file could not be read or parsed
    Entities { path: String, error: String },
    /// HTTP client construction failed
    Http(FetchError),
    /// Request gateway could not start
    Gateway(GatewayError),
    /// Acquisition ended without boundaries
    Acquisition(AcquisitionError),
    /// Async runtime could not start
    Runtime(io::Error),
    /// JSON output could not be produced
    Serialize(serde_json::Error),
}

impl CliError {
    /// Print the error and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Acquisition(AcquisitionError::CircuitOpen { .. }) => {
                eprintln!();
                eprintln!("Upstream providers failed repeatedly; requests are paused.");
                eprintln!("Try again later or point [sources] at another Overpass instance.");
            }
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Run 'prayermap-geo config show' to see the effective settings.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Entities { path, error } => {
                write!(f, "Failed to load entities from '{}': {}", path, error)
            }
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Gateway(e) => write!(f, "Failed to start request gateway: {}", e),
            CliError::Acquisition(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Serialize(e) => write!(f, "Failed to write JSON output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) | CliError::Runtime(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Gateway(e) => Some(e),
            CliError::Acquisition(e) => Some(e),
            CliError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<GatewayError> for CliError {
    fn from(e: GatewayError) -> Self {
        CliError::Gateway(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Http(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialize(e)
    }
}
