//! Provider fetch errors.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching from a boundary provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Provider answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Provider signalled rate limiting (HTTP 429)
    #[error("Rate limited by {url}")]
    RateLimited {
        url: String,
        /// Minimum wait requested via `Retry-After`, if the provider sent one
        retry_after: Option<Duration>,
    },

    /// Connection, timeout, or body read failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// Response did not match the provider's expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    pub fn is_invalid_payload(&self) -> bool {
        matches!(self, FetchError::InvalidPayload(_))
    }

    /// Provider's `Retry-After` hint, when rate limited.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Http {
            status: 503,
            url: "https://example.com".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://example.com");

        let err = FetchError::InvalidPayload("missing elements".to_string());
        assert!(err.to_string().contains("missing elements"));
        assert!(err.is_invalid_payload());
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_rate_limited_classification() {
        let err = FetchError::RateLimited {
            url: "https://overpass".to_string(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }
}
