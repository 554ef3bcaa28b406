//! Point-in-time gateway snapshot.

use std::fmt;
use std::time::Duration;

/// An immutable copy of [`GatewayMetrics`](super::GatewayMetrics).
///
/// Derived values are computed when the snapshot is taken.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewaySnapshot {
    /// How long the metrics have been collected
    pub uptime: Duration,

    // === Queue ===
    pub requests_enqueued: u64,
    pub requests_dispatched: u64,

    // === Outcomes ===
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    /// HTTP 429 responses
    pub rate_limited: u64,
    /// Retries scheduled after a rate limit
    pub retries: u64,
    /// Requests rejected by the open circuit
    pub circuit_rejections: u64,

    // === Timing ===
    pub total_latency: Duration,
    /// Mean latency of completed requests
    pub average_latency: Duration,
    /// Succeeded / completed (0.0 - 1.0)
    pub success_rate: f64,

    /// Most recent error message
    pub last_error: Option<String>,
}

impl GatewaySnapshot {
    /// Requests that finished, successfully or not.
    pub fn requests_completed(&self) -> u64 {
        self.requests_succeeded + self.requests_failed
    }

    /// Success rate as a percentage string.
    pub fn success_rate_display(&self) -> String {
        format!("{:.1}%", self.success_rate * 100.0)
    }
}

impl fmt::Display for GatewaySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Requests: {} enqueued, {} dispatched, {} succeeded, {} failed",
            self.requests_enqueued,
            self.requests_dispatched,
            self.requests_succeeded,
            self.requests_failed
        )?;
        writeln!(
            f,
            "Rate limited: {} ({} retries), circuit rejections: {}",
            self.rate_limited, self.retries, self.circuit_rejections
        )?;
        write!(
            f,
            "Success rate: {}, avg latency: {}ms",
            self.success_rate_display(),
            self.average_latency.as_millis()
        )?;
        if let Some(err) = &self.last_error {
            write!(f, "\nLast error: {}", err)?;
        }
        Ok(())
    }
}
