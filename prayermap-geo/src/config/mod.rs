//! Configuration file support.
//!
//! Settings live in `~/.prayermap-geo/config.ini`. A missing file means
//! defaults; a present file only needs the keys it wants to override.
//!
//! ```ini
//! [gateway]
//! min_delay_ms = 200
//! failure_threshold = 3
//!
//! [sources]
//! overpass_url = https://overpass-api.de/api/interpreter
//! ```
//!
//! [`ConfigFile`] converts each section into the runtime configuration of
//! the component it tunes (`gateway_config()`, `geometry_config()`, ...).

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, GatewaySettings, GeometrySettings, GranularitySettings, HierarchySettings,
    LoggingSettings, RetrySettings, SourceSettings, DEFAULT_LOG_FILE,
};
