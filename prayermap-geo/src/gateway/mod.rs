//! Rate-limited request gateway
//!
//! Every outbound boundary request is funnelled through a single
//! [`RequestGateway`], which:
//!
//! - dispatches requests one at a time, in FIFO order
//! - spaces dispatches at least `min_delay` apart
//! - retries rate-limited responses with exponential backoff ([`RetryPolicy`])
//! - stops sending requests for a cooldown after repeated failures
//!   ([`CircuitBreaker`])

mod circuit_breaker;
mod error;
mod policy;
mod service;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, DEFAULT_COOLDOWN,
    DEFAULT_FAILURE_THRESHOLD, MAX_COOLDOWN,
};
pub use error::GatewayError;
pub use policy::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_SECS,
    DEFAULT_MAX_RETRIES, MAX_RETRY_LIMIT,
};
pub use service::{GatewayConfig, GatewayStatus, RequestGateway, DEFAULT_MIN_DELAY_MS};
