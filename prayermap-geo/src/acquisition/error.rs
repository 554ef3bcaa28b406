//! Acquisition errors.

use std::time::Duration;
use thiserror::Error;

/// Why an acquisition ended without boundaries.
///
/// The variants let the map layer choose between degrading quietly (circuit
/// open), showing a retryable error (sources exhausted), or reporting bad
/// upstream data (validation).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    /// The gateway's circuit is open; no request was sent
    #[error("Boundary data temporarily unavailable, retrying in {}s", retry_in.as_secs())]
    CircuitOpen { retry_in: Duration },

    /// Every source in the plan failed
    #[error("All {attempted} boundary sources failed: {last_error}")]
    SourcesExhausted { attempted: usize, last_error: String },

    /// Sources answered, but no usable boundaries could be built
    #[error("No valid boundaries from {attempted} sources: {reason}")]
    Validation { attempted: usize, reason: String },
}

impl AcquisitionError {
    /// Whether the failure is temporary and the layer should degrade quietly.
    pub fn is_temporary(&self) -> bool {
        matches!(self, AcquisitionError::CircuitOpen { .. })
    }
}
