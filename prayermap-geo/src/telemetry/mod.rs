//! Gateway telemetry for observability and operator feedback.
//!
//! Lock-free atomic counters are updated by the request gateway as jobs move
//! through it. A [`GatewaySnapshot`] is an immutable copy for display.
//!
//! # Architecture
//!
//! ```text
//! RequestGateway ─────► GatewayMetrics ─────► GatewaySnapshot ─────► Views
//!                       (atomic counters)     (point-in-time copy)   (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```
//! use prayermap_geo::telemetry::GatewayMetrics;
//! use std::time::Duration;
//!
//! let metrics = GatewayMetrics::new();
//! metrics.request_enqueued();
//! metrics.request_dispatched();
//! metrics.request_succeeded(Duration::from_millis(40));
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.requests_succeeded, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::GatewayMetrics;
pub use snapshot::GatewaySnapshot;
