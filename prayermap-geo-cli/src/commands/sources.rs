//! `sources`: print the source plan for a zoom level.

use std::path::Path;

use clap::Args;
use prayermap_geo::source::{FallbackSourceResolver, QueryRequest, SourcePlan};

use super::common::{load_config, ScopeArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Map zoom level
    #[arg(long)]
    pub zoom: f64,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Include the full Overpass QL of each query
    #[arg(long)]
    pub show_queries: bool,
}

pub fn run(args: SourcesArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let resolver =
        FallbackSourceResolver::new(config.source_endpoints(), config.granularity_thresholds());
    let plan = resolver.select_source(args.zoom, &args.scope.to_scope());
    print_plan(&plan, args.show_queries);
    Ok(())
}

fn print_plan(plan: &SourcePlan, show_queries: bool) {
    println!("Granularity: {}", plan.granularity);
    println!("Cache TTL:   {} minutes", plan.cache_ttl_minutes);
    println!();

    for (i, query) in plan.attempts().enumerate() {
        let role = if i == 0 { "primary" } else { "fallback" };
        println!(
            "{}. [{}] {} ({}, {})",
            i + 1,
            role,
            query.label,
            query.provider,
            query.granularity
        );
        if show_queries {
            if let QueryRequest::Overpass(ql) = &query.request {
                for line in ql.lines() {
                    println!("       {}", line);
                }
            }
        }
    }
}
