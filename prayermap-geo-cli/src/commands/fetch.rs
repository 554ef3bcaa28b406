//! `fetch`: acquire boundaries from the live providers.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use prayermap_geo::acquisition::{AcquisitionOutcome, BoundaryAcquisition};
use prayermap_geo::boundary::GeometryProcessor;
use prayermap_geo::cache::BoundaryCache;
use prayermap_geo::gateway::{GatewayStatus, RequestGateway};
use prayermap_geo::geo::LonLat;
use prayermap_geo::logging::init_logging;
use prayermap_geo::source::{AsyncReqwestClient, FallbackSourceResolver, SourceFetcher};
use tracing::info;

use super::common::{load_config, ScopeArgs};
use crate::error::CliError;

/// Boundaries listed before the summary is truncated.
const MAX_LISTED: usize = 25;

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Map zoom level
    #[arg(long)]
    pub zoom: f64,

    /// Viewport center latitude, used for logging context
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Viewport center longitude, used for logging context
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Print the processed boundaries as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: FetchArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let _logging = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(CliError::LoggingInit)?;

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(async {
        let client = Arc::new(AsyncReqwestClient::with_timeout(config.sources.timeout_secs)?);
        let gateway = Arc::new(RequestGateway::new(config.gateway_config())?);
        let acquisition = BoundaryAcquisition::new(
            FallbackSourceResolver::new(
                config.source_endpoints(),
                config.granularity_thresholds(),
            ),
            SourceFetcher::new(client, config.sources.overpass_url.clone()),
            Arc::clone(&gateway),
            Arc::new(BoundaryCache::new()),
            GeometryProcessor::new(config.geometry_config()),
        );

        if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
            info!(zoom = args.zoom, center = %LonLat::new(lon, lat), "Fetching boundaries");
        }
        let outcome = acquisition.acquire(args.zoom, &args.scope.to_scope()).await;
        let snapshot = gateway.metrics().snapshot();
        let status = gateway.state();
        gateway.shutdown();

        if let Some(err) = outcome.error.clone() {
            return Err(CliError::Acquisition(err));
        }

        if args.json {
            let json = serde_json::to_string_pretty(outcome.boundaries.as_slice())?;
            println!("{}", json);
        } else {
            print_summary(&outcome);
            println!();
            println!("Providers: {}", provider_status(&status));
            println!("{}", snapshot);
        }
        Ok::<(), CliError>(())
    })
}

/// Circuit breaker state as shown to the user.
fn provider_status(status: &GatewayStatus) -> String {
    match status.circuit_reset_in {
        Some(reset_in) => format!(
            "{} (resumes in {}s)",
            status.circuit.display_status(),
            reset_in.as_secs()
        ),
        None => status.circuit.display_status().to_string(),
    }
}

fn print_summary(outcome: &AcquisitionOutcome) {
    let dataset = outcome
        .dataset_granularity
        .map(|g| g.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "Requested {} boundaries, received {} ({})",
        outcome.requested_granularity,
        dataset,
        outcome.source.as_deref().unwrap_or("no source")
    );
    if outcome.is_degraded() {
        println!("Served by a coarser fallback dataset");
    }
    if outcome.dropped_features > 0 {
        println!("Dropped {} invalid features", outcome.dropped_features);
    }
    println!();

    for boundary in outcome.boundaries.iter().take(MAX_LISTED) {
        println!(
            "  {:<32} {:<12} {:>3} rings {:>7} points",
            boundary.name(),
            boundary.kind(),
            boundary.coordinates().len(),
            boundary.point_count()
        );
    }
    if outcome.boundaries.len() > MAX_LISTED {
        println!("  ... and {} more", outcome.boundaries.len() - MAX_LISTED);
    }
    println!("{} boundaries", outcome.boundaries.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use prayermap_geo::gateway::CircuitState;
    use std::time::Duration;

    fn status(circuit: CircuitState, circuit_reset_in: Option<Duration>) -> GatewayStatus {
        GatewayStatus {
            pending: 0,
            processing: false,
            consecutive_failures: 0,
            circuit,
            circuit_reset_in,
            since_last_dispatch: None,
            shut_down: false,
        }
    }

    #[test]
    fn test_provider_status() {
        assert_eq!(provider_status(&status(CircuitState::Closed, None)), "Available");
        assert_eq!(
            provider_status(&status(CircuitState::Open, Some(Duration::from_secs(42)))),
            "Temporarily unavailable (resumes in 42s)"
        );
    }
}
