//! Retry policy for rate-limited requests.
//!
//! Only rate limiting is retried. Every other failure ends the request and
//! counts against the circuit breaker straight away.
//!
//! # Example
//!
//! ```
//! use prayermap_geo::gateway::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(3);
//! assert_eq!(policy.delay_for_retry(1, None), Some(Duration::from_secs(1)));
//! assert_eq!(policy.delay_for_retry(2, None), Some(Duration::from_secs(2)));
//! assert_eq!(policy.delay_for_retry(4, None), None);
//! ```

use std::time::Duration;

/// Default delay before the first retry (1 second).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Default maximum delay between retries (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Largest retry budget accepted from configuration.
pub const MAX_RETRY_LIMIT: u32 = 10;

/// How a rate-limited request is retried.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries; a 429 fails the request immediately.
    None,

    /// Exponential backoff between attempts.
    ExponentialBackoff {
        /// Retries allowed after the initial attempt.
        max_retries: u32,
        /// Delay before the first retry.
        initial_delay: Duration,
        /// Upper bound for any single delay.
        max_delay: Duration,
        /// Growth factor per retry (typically 2.0).
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Exponential backoff with default delays.
    pub fn exponential(max_retries: u32) -> Self {
        Self::ExponentialBackoff {
            max_retries,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Delay before retry number `retry` (1-based), or `None` once the
    /// budget is spent.
    ///
    /// A provider-supplied `Retry-After` raises the delay to at least that
    /// value, still bounded by `max_delay`.
    pub fn delay_for_retry(&self, retry: u32, retry_after: Option<Duration>) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::ExponentialBackoff {
                max_retries,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if retry == 0 || retry > *max_retries {
                    return None;
                }
                let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
                let factor = multiplier.powi(exponent);
                let delay_ms = (initial_delay.as_millis() as f64 * factor)
                    .min(max_delay.as_millis() as f64);
                let backoff = Duration::from_millis(delay_ms as u64);
                let delay = match retry_after {
                    Some(hint) => backoff.max(hint),
                    None => backoff,
                };
                Some(delay.min(*max_delay))
            }
        }
    }

    /// Retries allowed after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::ExponentialBackoff { max_retries, .. } => *max_retries,
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries().saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::None;
        assert_eq!(policy.delay_for_retry(1, None), None);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_huge_retry_counts_saturate() {
        let policy = RetryPolicy::exponential(u32::MAX);
        let cap = Duration::from_secs(DEFAULT_MAX_DELAY_SECS);
        assert_eq!(policy.delay_for_retry(u32::MAX, None), Some(cap));
        assert_eq!(policy.delay_for_retry(1 << 31, None), Some(cap));
        assert_eq!(policy.max_attempts(), u32::MAX);
    }

    #[test]
    fn test_exponential_backoff_grows_and_caps() {
        let policy = RetryPolicy::ExponentialBackoff {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_retry(1, None), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_retry(2, None), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_retry(3, None), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_retry(5, None), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for_retry(10, None), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for_retry(11, None), None);
    }

    #[test]
    fn test_retry_after_raises_delay() {
        let policy = RetryPolicy::exponential(3);
        assert_eq!(
            policy.delay_for_retry(1, Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
        // Hint below the backoff does not shorten it
        assert_eq!(
            policy.delay_for_retry(3, Some(Duration::from_millis(10))),
            Some(Duration::from_secs(4))
        );
        // Hint is still bounded by max_delay
        assert_eq!(
            policy.delay_for_retry(1, Some(Duration::from_secs(600))),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_retry_zero_is_not_a_retry() {
        assert_eq!(RetryPolicy::exponential(3).delay_for_retry(0, None), None);
    }
}
