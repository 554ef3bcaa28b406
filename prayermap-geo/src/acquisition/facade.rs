//! Boundary acquisition facade.
//!
//! The only entry point that touches the resolver, cache, gateway, and
//! geometry processor. Each call walks a small state machine:
//!
//! ```text
//! Resolving → CacheCheck ─┬─ hit ──────────────────────────────► Done
//!                         └─ miss → Fetching → Processing → Caching → Done
//!                                      │   ▲        │
//!                                      │   └────────┘ no valid geometry, next source
//!                                      └─► Failed (circuit open, or every source failed)
//! ```
//!
//! Every path returns an [`AcquisitionOutcome`]; failures carry an empty
//! boundary list plus an [`AcquisitionError`].

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::AcquisitionError;
use crate::boundary::{BoundaryType, GeometryProcessor, ProcessedBoundary, RawFeature};
use crate::cache::{BoundaryCache, CacheKey};
use crate::gateway::{GatewayError, RequestGateway, RetryPolicy};
use crate::source::{
    AsyncHttpClient, FallbackSourceResolver, QueryScope, SourceFetcher, SourceQuery,
};

/// Cache lifetime for results served by a coarser substitute, in minutes.
///
/// Kept short so the preferred source is tried again soon.
pub const DEGRADED_TTL_MINUTES: u64 = 30;

/// Steps of a single acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPhase {
    Resolving,
    CacheCheck,
    Fetching,
    Processing,
    Caching,
    Done,
    Failed,
}

impl AcquisitionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquisitionPhase::Done | AcquisitionPhase::Failed)
    }
}

/// Result of one acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionOutcome {
    pub boundaries: Arc<Vec<ProcessedBoundary>>,
    /// Granularity the zoom level asked for
    pub requested_granularity: BoundaryType,
    /// Granularity actually served; coarser than requested when a degraded
    /// substitute was used
    pub dataset_granularity: Option<BoundaryType>,
    /// Label of the source that produced the data
    pub source: Option<String>,
    pub from_cache: bool,
    /// Features dropped by geometry validation
    pub dropped_features: usize,
    /// Phases visited, in order
    pub phases: Vec<AcquisitionPhase>,
    pub error: Option<AcquisitionError>,
}

impl AcquisitionOutcome {
    fn new(requested_granularity: BoundaryType) -> Self {
        Self {
            boundaries: Arc::new(Vec::new()),
            requested_granularity,
            dataset_granularity: None,
            source: None,
            from_cache: false,
            dropped_features: 0,
            phases: Vec::new(),
            error: None,
        }
    }

    /// The terminal phase.
    pub fn phase(&self) -> AcquisitionPhase {
        self.phases
            .last()
            .copied()
            .unwrap_or(AcquisitionPhase::Resolving)
    }

    pub fn is_done(&self) -> bool {
        self.phase() == AcquisitionPhase::Done
    }

    /// Whether a coarser substitute was served.
    pub fn is_degraded(&self) -> bool {
        self.dataset_granularity
            .is_some_and(|g| g != self.requested_granularity)
    }

    fn enter(&mut self, phase: AcquisitionPhase) {
        debug!(?phase, "Acquisition phase");
        self.phases.push(phase);
    }

    fn fail(&mut self, error: AcquisitionError) {
        warn!(error = %error, "Boundary acquisition failed");
        self.boundaries = Arc::new(Vec::new());
        self.error = Some(error);
        self.enter(AcquisitionPhase::Failed);
    }
}

/// Why a single source in the plan did not produce boundaries.
#[derive(Debug)]
enum AttemptFailure {
    /// Fetch or payload validation failed in the gateway
    Gateway(GatewayError),
    /// Every feature failed geometry validation
    Geometry { features: usize },
    /// The source answered with no features
    Empty,
}

impl AttemptFailure {
    fn is_validation(&self) -> bool {
        match self {
            AttemptFailure::Gateway(err) => err
                .fetch_error()
                .is_some_and(|e| e.is_invalid_payload()),
            AttemptFailure::Geometry { .. } => true,
            AttemptFailure::Empty => false,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Gateway(err) => write!(f, "{}", err),
            AttemptFailure::Geometry { features } => {
                write!(f, "all {} features failed geometry validation", features)
            }
            AttemptFailure::Empty => f.write_str("no features"),
        }
    }
}

/// Maps the failures of an exhausted plan to an error.
///
/// `None` means every source answered with nothing, which is not an error.
fn classify(failures: &[(String, AttemptFailure)]) -> Option<AcquisitionError> {
    let attempted = failures.len();
    let errors: Vec<&(String, AttemptFailure)> = failures
        .iter()
        .filter(|(_, f)| !matches!(f, AttemptFailure::Empty))
        .collect();

    let (label, last) = errors.last()?;
    if errors.iter().all(|(_, f)| f.is_validation()) {
        Some(AcquisitionError::Validation {
            attempted,
            reason: format!("{}: {}", label, last),
        })
    } else {
        Some(AcquisitionError::SourcesExhausted {
            attempted,
            last_error: format!("{}: {}", label, last),
        })
    }
}

/// Orchestrates resolve → cache → fetch with fallback → process → cache.
pub struct BoundaryAcquisition<C: AsyncHttpClient + 'static> {
    resolver: FallbackSourceResolver,
    fetcher: SourceFetcher<C>,
    gateway: Arc<RequestGateway>,
    cache: Arc<BoundaryCache>,
    processor: GeometryProcessor,
    retry: RetryPolicy,
}

impl<C: AsyncHttpClient + 'static> BoundaryAcquisition<C> {
    /// Creates the facade. Uses the gateway's retry policy.
    pub fn new(
        resolver: FallbackSourceResolver,
        fetcher: SourceFetcher<C>,
        gateway: Arc<RequestGateway>,
        cache: Arc<BoundaryCache>,
        processor: GeometryProcessor,
    ) -> Self {
        let retry = gateway.config().retry.clone();
        Self {
            resolver,
            fetcher,
            gateway,
            cache,
            processor,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn resolver(&self) -> &FallbackSourceResolver {
        &self.resolver
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    pub fn cache(&self) -> &Arc<BoundaryCache> {
        &self.cache
    }

    pub fn processor(&self) -> &GeometryProcessor {
        &self.processor
    }

    /// Acquires boundaries for a zoom level and scope, using the cache.
    pub async fn acquire(&self, zoom: f64, scope: &QueryScope) -> AcquisitionOutcome {
        self.run(zoom, scope, true).await
    }

    /// Acquires boundaries without reading the cache. The result is still
    /// cached.
    pub async fn acquire_fresh(&self, zoom: f64, scope: &QueryScope) -> AcquisitionOutcome {
        self.run(zoom, scope, false).await
    }

    async fn run(&self, zoom: f64, scope: &QueryScope, use_cache: bool) -> AcquisitionOutcome {
        let scope = scope.clone().normalized();
        let plan = self.resolver.select_source(zoom, &scope);
        let mut outcome = AcquisitionOutcome::new(plan.granularity);
        outcome.enter(AcquisitionPhase::Resolving);

        let key = CacheKey::new(plan.granularity, zoom, &scope);
        outcome.enter(AcquisitionPhase::CacheCheck);
        if use_cache {
            if let Some(data) = self.cache.get(&key) {
                debug!(key = %key, boundaries = data.len(), "Boundary cache hit");
                outcome.dataset_granularity =
                    Some(data.first().map(|b| b.kind()).unwrap_or(plan.granularity));
                outcome.boundaries = data;
                outcome.from_cache = true;
                outcome.enter(AcquisitionPhase::Done);
                return outcome;
            }
        }

        let mut failures: Vec<(String, AttemptFailure)> = Vec::new();
        for query in plan.attempts() {
            outcome.enter(AcquisitionPhase::Fetching);

            let features = match self.fetch(query).await {
                Ok(features) => features,
                Err(GatewayError::CircuitOpen { retry_in }) => {
                    outcome.fail(AcquisitionError::CircuitOpen { retry_in });
                    return outcome;
                }
                Err(err) => {
                    warn!(source = %query.label, error = %err, "Boundary source failed");
                    failures.push((query.label.clone(), AttemptFailure::Gateway(err)));
                    continue;
                }
            };

            if features.is_empty() {
                debug!(source = %query.label, "Boundary source returned no features");
                failures.push((query.label.clone(), AttemptFailure::Empty));
                continue;
            }

            outcome.enter(AcquisitionPhase::Processing);
            let batch = self.processor.process_batch(&features, query.granularity);
            if batch.boundaries.is_empty() {
                warn!(
                    source = %query.label,
                    features = features.len(),
                    "No feature passed geometry validation"
                );
                failures.push((
                    query.label.clone(),
                    AttemptFailure::Geometry {
                        features: features.len(),
                    },
                ));
                continue;
            }

            outcome.enter(AcquisitionPhase::Caching);
            let ttl_minutes = if query.granularity == plan.granularity {
                plan.cache_ttl_minutes
            } else {
                DEGRADED_TTL_MINUTES.min(plan.cache_ttl_minutes)
            };
            let data = Arc::new(batch.boundaries);
            self.cache.insert(key, Arc::clone(&data), ttl_minutes);

            info!(
                source = %query.label,
                granularity = %query.granularity,
                boundaries = data.len(),
                dropped = batch.dropped,
                "Boundaries acquired"
            );
            outcome.boundaries = data;
            outcome.dataset_granularity = Some(query.granularity);
            outcome.source = Some(query.label.clone());
            outcome.dropped_features = batch.dropped;
            outcome.enter(AcquisitionPhase::Done);
            return outcome;
        }

        match classify(&failures) {
            Some(err) => outcome.fail(err),
            None => {
                debug!("Every boundary source was empty");
                outcome.enter(AcquisitionPhase::Done);
            }
        }
        outcome
    }

    /// Runs one query through the gateway. Payload validation happens inside
    /// the gateway job so malformed responses count as request failures.
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawFeature>, GatewayError> {
        let fetcher = self.fetcher.clone();
        let query = query.clone();
        self.gateway
            .enqueue_with_retry(&self.retry, move || {
                let fetcher = fetcher.clone();
                let query = query.clone();
                async move { fetcher.fetch(&query).await }
            })
            .await
    }
}
