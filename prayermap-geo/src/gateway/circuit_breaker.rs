//! Consecutive-failure circuit breaker for outbound boundary requests.
//!
//! # State Machine
//!
//! ```text
//! Closed --[consecutive_failures >= threshold]--> Open (reset_at = now + cooldown)
//! Open   --[check() after reset_at]-------------> Closed (failures reset to 0)
//! any    --[success]-----------------------------> Closed (failures reset to 0)
//! ```
//!
//! There is no half-open probe state: once the cooldown passes the breaker
//! closes optimistically and the next request goes through normally.
//!
//! Time comes from `tokio::time::Instant` so tests can drive the cooldown with
//! a paused clock.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of consecutive failures that opens the circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default time the circuit stays open.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Longest cooldown accepted from configuration (one day).
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the circuit breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit (default: 3).
    pub failure_threshold: u32,
    /// How long the circuit stays open (default: 5 minutes).
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected until the cooldown elapses.
    Open,
}

impl CircuitState {
    /// User-facing wording for the map layer.
    pub fn display_status(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Available",
            CircuitState::Open => "Temporarily unavailable",
        }
    }
}

#[derive(Debug)]
struct CircuitBreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    reset_at: Option<Instant>,
}

/// Failure-counting circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitBreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitBreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                reset_at: None,
            }),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Checks whether a request may proceed.
    ///
    /// Closes the circuit if its cooldown has elapsed. Returns the remaining
    /// cooldown when the circuit is still open.
    pub fn check(&self) -> Result<(), Duration> {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::Closed {
            return Ok(());
        }

        let now = Instant::now();
        match inner.reset_at {
            Some(reset_at) if now < reset_at => Err(reset_at - now),
            _ => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.reset_at = None;
                tracing::info!("Circuit breaker CLOSED: cooldown elapsed, resuming requests");
                Ok(())
            }
        }
    }

    /// Records a successful request.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.consecutive_failures > 0 {
            tracing::debug!(
                previous_failures = inner.consecutive_failures,
                "Circuit breaker: success, resetting failure count"
            );
        }
        inner.consecutive_failures = 0;
        if inner.state == CircuitState::Open {
            inner.state = CircuitState::Closed;
            inner.reset_at = None;
            tracing::info!("Circuit breaker CLOSED: in-flight request succeeded");
        }
    }

    /// Records a failed request. Returns `true` if this failure opened the circuit.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        if inner.state == CircuitState::Closed
            && inner.consecutive_failures >= self.config.failure_threshold
        {
            inner.state = CircuitState::Open;
            let now = Instant::now();
            inner.reset_at = Some(
                now.checked_add(self.config.cooldown)
                    .unwrap_or_else(|| now + MAX_COOLDOWN),
            );
            tracing::info!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "Circuit breaker OPENED: boundary requests paused"
            );
            return true;
        }

        tracing::debug!(
            failures = inner.consecutive_failures,
            threshold = self.config.failure_threshold,
            "Circuit breaker: failure recorded"
        );
        false
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Remaining cooldown, if open.
    pub fn reset_in(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        match (inner.state, inner.reset_at) {
            (CircuitState::Open, Some(reset_at)) => {
                Some(reset_at.saturating_duration_since(Instant::now()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig::default())
    }

    #[test]
    fn test_circuit_breaker_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.cooldown, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_circuit_breaker_initial_state() {
        let cb = breaker();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.check().is_ok());
        assert_eq!(cb.consecutive_failures(), 0);
        assert!(cb.reset_in().is_none());
    }

    #[tokio::test]
    async fn test_opens_at_threshold() {
        let cb = breaker();
        assert!(!cb.record_failure());
        assert!(!cb.record_failure());
        assert!(cb.record_failure());
        assert!(cb.is_open());

        let retry_in = cb.check().unwrap_err();
        assert!(retry_in <= Duration::from_secs(300));
        assert!(retry_in > Duration::from_secs(299));
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);
        assert!(!cb.record_failure());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_after_cooldown() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure();
        }
        assert!(cb.check().is_err());

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cb.check().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cb.check().is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_failures_while_open_do_not_extend_cooldown() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure();
        }
        let before = cb.reset_in().unwrap();
        assert!(!cb.record_failure());
        assert!(cb.reset_in().unwrap() <= before);
    }

    #[tokio::test]
    async fn test_unbounded_cooldown_falls_back_to_max() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::MAX,
        });
        assert!(cb.record_failure());
        assert!(cb.is_open());
        let remaining = cb.check().unwrap_err();
        assert!(remaining <= MAX_COOLDOWN);
        assert!(remaining > MAX_COOLDOWN - Duration::from_secs(1));
    }

    #[test]
    fn test_circuit_state_display_status() {
        assert_eq!(CircuitState::Closed.display_status(), "Available");
        assert_eq!(
            CircuitState::Open.display_status(),
            "Temporarily unavailable"
        );
    }
}
