//! Argument types and helpers shared across CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use prayermap_geo::config::{config_file_path, ConfigFile};
use prayermap_geo::geo::BoundingBox;
use prayermap_geo::hierarchy::EntityDirectory;
use prayermap_geo::source::QueryScope;

use crate::error::CliError;

/// Dataset scope flags accepted by `sources` and `fetch`.
#[derive(Debug, Clone, Default, Args)]
pub struct ScopeArgs {
    /// Bounding box as south,west,north,east in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// ISO 3166-1 alpha-2 country code (e.g. KE)
    #[arg(long)]
    pub country: Option<String>,

    /// ISO 3166-2 region code (e.g. US-CA); overrides --country
    #[arg(long)]
    pub region: Option<String>,
}

impl ScopeArgs {
    pub fn to_scope(&self) -> QueryScope {
        QueryScope {
            bbox: self.bbox,
            country: self.country.clone(),
            region: self.region.clone(),
        }
        .normalized()
    }
}

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&config_path(path))?)
}

/// Resolve the config path flag against the default.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

/// Load an entity directory from a JSON array file.
pub fn load_entities(path: &Path) -> Result<EntityDirectory, CliError> {
    let display = path.display().to_string();
    let json = fs::read_to_string(path).map_err(|e| CliError::Entities {
        path: display.clone(),
        error: e.to_string(),
    })?;
    EntityDirectory::from_json(&json).map_err(|e| CliError::Entities {
        path: display,
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_args_normalize_codes() {
        let args = ScopeArgs {
            country: Some("ke".into()),
            ..Default::default()
        };
        assert_eq!(args.to_scope().country.as_deref(), Some("KE"));
    }

    #[test]
    fn test_load_entities_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("entities.json");
        fs::write(&path, "not json").unwrap();

        match load_entities(&path) {
            Err(CliError::Entities { path: p, .. }) => assert!(p.ends_with("entities.json")),
            other => panic!("unexpected: {:?}", other.map(|d| d.len())),
        }
    }
}
