//! `resolve`: show the hierarchy level for a viewport.

use std::path::{Path, PathBuf};

use clap::Args;
use prayermap_geo::geo::LonLat;
use prayermap_geo::hierarchy::{EntityDirectory, HierarchyLevel, HierarchyResolver};

use super::common::{load_config, load_entities};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Map zoom level
    #[arg(long)]
    pub zoom: f64,

    /// Viewport center latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Viewport center longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// JSON array of entities (id, name, type, coordinates, parent_id, value)
    #[arg(long)]
    pub entities: Option<PathBuf>,

    /// Entity id selected by the user
    #[arg(long)]
    pub selected: Option<String>,

    /// Print the level as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ResolveArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let directory = match &args.entities {
        Some(path) => load_entities(path)?,
        None => EntityDirectory::default(),
    };
    let resolver = HierarchyResolver::new(directory).with_thresholds(config.level_thresholds());

    let center = LonLat::new(args.lon, args.lat);
    if !center.is_valid() {
        return Err(CliError::InvalidArgument(format!(
            "center {} is outside valid coordinates",
            center
        )));
    }

    let level = resolver.resolve(args.zoom, center, args.selected.as_deref());
    if args.json {
        let json = serde_json::to_string_pretty(&level)?;
        println!("{}", json);
    } else {
        print_level(&resolver, &level);
    }
    Ok(())
}

fn print_level(resolver: &HierarchyResolver, level: &HierarchyLevel) {
    println!("Level:    {} (zoom {})", level.level, level.zoom);

    match &level.focus {
        Some(focus) => {
            let path = resolver
                .ancestors(&focus.id)
                .iter()
                .rev()
                .map(|e| e.name.as_str())
                .chain(std::iter::once(focus.name.as_str()))
                .collect::<Vec<_>>()
                .join(" > ");
            println!("Focus:    {} [{}]", path, focus.id);
        }
        None => println!("Focus:    (none)"),
    }

    let stats = &level.aggregated;
    println!(
        "Totals:   {} across {} entities ({} critical, {} revival)",
        stats.total, stats.entity_count, stats.critical_count, stats.revival_count
    );

    println!();
    println!("Children ({}):", level.children.len());
    for child in &level.children {
        println!("  {:<24} {:>10}  {}", child.name, child.value, child.id);
    }
}
