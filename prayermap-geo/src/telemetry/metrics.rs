//! Lock-free atomic metrics collection.
//!
//! Uses `AtomicU64` for thread-safe counters without locks. The last error
//! message is the only field behind a mutex.

use super::GatewaySnapshot;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for the request gateway.
///
/// All counters use `Relaxed` ordering; they are independent measurements.
pub struct GatewayMetrics {
    /// When metrics collection started
    start_time: Instant,

    // === Queue metrics ===
    /// Requests accepted into the queue
    requests_enqueued: AtomicU64,
    /// Requests handed to a provider
    requests_dispatched: AtomicU64,

    // === Outcome metrics ===
    /// Requests that completed successfully
    requests_succeeded: AtomicU64,
    /// Requests that completed with an error (rate limits included)
    requests_failed: AtomicU64,
    /// Responses that were HTTP 429
    rate_limited: AtomicU64,
    /// Retries scheduled after a rate limit
    retries: AtomicU64,
    /// Requests rejected because the circuit was open
    circuit_rejections: AtomicU64,

    // === Timing (microseconds) ===
    /// Cumulative request latency of completed requests
    latency_us: AtomicU64,

    /// Most recent error message
    last_error: Mutex<Option<String>>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests_enqueued: AtomicU64::new(0),
            requests_dispatched: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            circuit_rejections: AtomicU64::new(0),
            latency_us: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    // === Queue tracking ===

    /// Record a request entering the queue.
    pub fn request_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request leaving the queue for its provider.
    pub fn request_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    // === Outcome tracking ===

    /// Record a successful request.
    pub fn request_succeeded(&self, latency: Duration) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        self.add_latency(latency);
    }

    /// Record a failed request.
    ///
    /// `rate_limited` also bumps the 429 counter.
    pub fn request_failed(&self, latency: Duration, rate_limited: bool, message: String) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        if rate_limited {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
        self.add_latency(latency);
        *self.last_error.lock() = Some(message);
    }

    /// Record a retry being scheduled.
    pub fn retry_scheduled(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected by the open circuit.
    pub fn circuit_rejected(&self) {
        self.circuit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    fn add_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_us.fetch_add(micros, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot.
    pub fn snapshot(&self) -> GatewaySnapshot {
        let succeeded = self.requests_succeeded.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let completed = succeeded + failed;
        let latency_us = self.latency_us.load(Ordering::Relaxed);

        let average_latency = if completed > 0 {
            Duration::from_micros(latency_us / completed)
        } else {
            Duration::ZERO
        };
        let success_rate = if completed > 0 {
            succeeded as f64 / completed as f64
        } else {
            0.0
        };

        GatewaySnapshot {
            uptime: self.start_time.elapsed(),
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            requests_succeeded: succeeded,
            requests_failed: failed,
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            circuit_rejections: self.circuit_rejections.load(Ordering::Relaxed),
            total_latency: Duration::from_micros(latency_us),
            average_latency,
            success_rate,
            last_error: self.last_error.lock().clone(),
        }
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
