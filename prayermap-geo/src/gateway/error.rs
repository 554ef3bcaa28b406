//! Gateway errors.

use std::time::Duration;
use thiserror::Error;

use crate::source::FetchError;

/// Errors returned by [`RequestGateway`](super::RequestGateway).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Circuit breaker is open; no request was sent
    #[error("Circuit open: boundary requests paused for {}s", retry_in.as_secs())]
    CircuitOpen { retry_in: Duration },

    /// Provider kept rate limiting until the retry budget ran out
    #[error("Rate limited after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: FetchError },

    /// The request ran and failed
    #[error(transparent)]
    Request(FetchError),

    /// The gateway has shut down
    #[error("Request gateway is shut down")]
    Closed,

    /// The queued request was discarded before it ran
    #[error("Request was dropped before dispatch")]
    Dropped,

    /// Gateway was started outside a Tokio runtime
    #[error("Request gateway requires a Tokio runtime")]
    NoRuntime,
}

impl GatewayError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GatewayError::CircuitOpen { .. })
    }

    /// The underlying provider error, if the request reached a provider.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            GatewayError::Request(e) => Some(e),
            GatewayError::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::CircuitOpen {
            retry_in: Duration::from_secs(120),
        };
        assert_eq!(
            err.to_string(),
            "Circuit open: boundary requests paused for 120s"
        );
        assert!(err.is_circuit_open());
        assert!(err.fetch_error().is_none());
    }

    #[test]
    fn test_request_error_is_transparent() {
        let inner = FetchError::Transport("connection reset".into());
        let err = GatewayError::Request(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.fetch_error(), Some(&inner));
    }
}
