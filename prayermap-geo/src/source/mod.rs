//! Boundary data sources
//!
//! This module covers everything between a zoom level and a list of raw
//! features: choosing the provider chain ([`FallbackSourceResolver`]),
//! issuing the request ([`SourceFetcher`] over an [`AsyncHttpClient`]), and
//! validating the provider's payload shape.
//!
//! # Example
//!
//! ```ignore
//! use prayermap_geo::source::{AsyncReqwestClient, FallbackSourceResolver, QueryScope};
//!
//! let resolver = FallbackSourceResolver::default();
//! let plan = resolver.select_source(9.0, &QueryScope::default());
//! for query in plan.attempts() {
//!     println!("{}", query.label);
//! }
//! ```

mod error;
mod fetcher;
mod http;
mod query;
mod resolver;
mod validate;

pub use error::FetchError;
pub use fetcher::SourceFetcher;
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use query::{
    build_overpass_ql, OverpassSelector, ProviderKind, QueryRequest, QueryScope, SourceQuery,
    OVERPASS_TIMEOUT_SECS,
};
pub use resolver::{
    cache_ttl_minutes, FallbackSourceResolver, GranularityThresholds, SourceEndpoints, SourcePlan,
    DEFAULT_DATASET_BASE_URL, DEFAULT_DATASET_MIRROR_URL, DEFAULT_OVERPASS_URL,
};
pub use validate::{apply_scope, stitch_rings, validate_geojson, validate_overpass};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
