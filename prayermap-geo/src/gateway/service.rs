//! Serialized, paced request gateway.
//!
//! All outbound provider requests go through one [`RequestGateway`]. It is a
//! long-lived service object: construct it once, wrap it in an `Arc`, and
//! inject it wherever requests are made.
//!
//! # Architecture
//!
//! ```text
//! enqueue() ──► circuit check ──► FIFO channel ──► worker task
//!                   │                                  │
//!                   └─► CircuitOpen                    ├─ circuit check
//!                                                      ├─ wait min_delay since last dispatch
//!                                                      ├─ run request to completion
//!                                                      └─ record success / failure
//! ```
//!
//! The worker owns dispatch. A caller that stops awaiting its result does not
//! cancel a request that has already been dispatched.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::error::GatewayError;
use super::policy::RetryPolicy;
use crate::source::FetchError;
use crate::telemetry::GatewayMetrics;

/// Default minimum spacing between dispatches (200ms).
pub const DEFAULT_MIN_DELAY_MS: u64 = 200;

/// Gateway configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayConfig {
    /// Minimum time between two dispatches.
    pub min_delay: Duration,
    /// Circuit breaker settings.
    pub circuit: CircuitBreakerConfig,
    /// Retry policy used by callers that do not bring their own.
    pub retry: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            circuit: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Point-in-time view of the gateway for debugging.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayStatus {
    /// Requests waiting in the queue
    pub pending: usize,
    /// Whether a request is currently running
    pub processing: bool,
    pub consecutive_failures: u32,
    pub circuit: CircuitState,
    /// Remaining cooldown while the circuit is open
    pub circuit_reset_in: Option<Duration>,
    /// Time since the last dispatch
    pub since_last_dispatch: Option<Duration>,
    pub shut_down: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: usize,
    processing: bool,
    last_dispatch: Option<Instant>,
}

impl QueueState {
    fn dequeued(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }
}

/// A request waiting in the queue, with its result channel.
trait QueuedRequest: Send {
    /// Runs the request and delivers its result.
    fn run(self: Box<Self>) -> BoxFuture<'static, ()>;

    /// Delivers an error without running the request.
    fn reject(self: Box<Self>, error: GatewayError);
}

struct PendingRequest<T, F> {
    request: F,
    reply: oneshot::Sender<Result<T, GatewayError>>,
    /// Whether a 429 counts against the circuit breaker. False for retry
    /// attempts that still have budget left.
    rate_limit_is_failure: bool,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<GatewayMetrics>,
}

impl<T, F, Fut> QueuedRequest for PendingRequest<T, F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let PendingRequest {
            request,
            reply,
            rate_limit_is_failure,
            breaker,
            metrics,
        } = *self;

        Box::pin(async move {
            let started = Instant::now();
            let result = request().await;
            let elapsed = started.elapsed();

            match &result {
                Ok(_) => {
                    metrics.request_succeeded(elapsed);
                    breaker.record_success();
                }
                Err(e) => {
                    metrics.request_failed(elapsed, e.is_rate_limited(), e.to_string());
                    if rate_limit_is_failure || !e.is_rate_limited() {
                        breaker.record_failure();
                    }
                }
            }

            // Caller may have stopped waiting
            let _ = reply.send(result.map_err(GatewayError::Request));
        })
    }

    fn reject(self: Box<Self>, error: GatewayError) {
        let _ = self.reply.send(Err(error));
    }
}

type Job = Box<dyn QueuedRequest>;

/// Rate-limited request gateway with a circuit breaker.
///
/// # Example
///
/// ```ignore
/// use prayermap_geo::gateway::{GatewayConfig, RequestGateway};
/// use std::sync::Arc;
///
/// let gateway = Arc::new(RequestGateway::new(GatewayConfig::default())?);
/// let bytes = gateway
///     .enqueue_with_retry(&gateway.config().retry, move || {
///         let client = client.clone();
///         async move { client.get("https://example.com/data.geojson").await }
///     })
///     .await?;
/// ```
pub struct RequestGateway {
    config: GatewayConfig,
    sender: mpsc::UnboundedSender<Job>,
    state: Arc<Mutex<QueueState>>,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<GatewayMetrics>,
    shutdown: CancellationToken,
}

impl RequestGateway {
    /// Starts a gateway with its own metrics.
    ///
    /// Must be called from within a Tokio runtime; the worker task is spawned
    /// on the current runtime.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_metrics(config, Arc::new(GatewayMetrics::new()))
    }

    /// Starts a gateway that records into shared metrics.
    pub fn with_metrics(
        config: GatewayConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Result<Self, GatewayError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| GatewayError::NoRuntime)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(QueueState::default()));
        let breaker = Arc::new(CircuitBreaker::new(config.circuit.clone()));
        let shutdown = CancellationToken::new();

        handle.spawn(run_worker(
            receiver,
            config.min_delay,
            Arc::clone(&state),
            Arc::clone(&breaker),
            Arc::clone(&metrics),
            shutdown.clone(),
        ));

        Ok(Self {
            config,
            sender,
            state,
            breaker,
            metrics,
            shutdown,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// Queues a request and waits for its result.
    ///
    /// Rejected immediately with [`GatewayError::CircuitOpen`] while the
    /// circuit is open. Any error from the request counts as one failure.
    pub async fn enqueue<T, F, Fut>(&self, request: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(request, true).await
    }

    /// Queues a request, retrying rate-limited responses with backoff.
    ///
    /// Each attempt goes back through the queue and the circuit check. Other
    /// errors are returned as-is. Running out of retries yields
    /// [`GatewayError::RetriesExhausted`] and counts as a single failure.
    pub async fn enqueue_with_retry<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        make_request: F,
    ) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
        T: Send + 'static,
    {
        let make_request = Arc::new(make_request);
        let mut retry = 0;

        loop {
            let last_attempt = retry >= policy.max_retries();
            let make = Arc::clone(&make_request);

            match self.submit(move || (*make)(), last_attempt).await {
                Err(GatewayError::Request(err)) if err.is_rate_limited() => {
                    retry += 1;
                    match policy.delay_for_retry(retry, err.retry_after()) {
                        Some(delay) => {
                            self.metrics.retry_scheduled();
                            warn!(
                                retry,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "Rate limited, backing off"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            warn!(attempts = retry, error = %err, "Rate limit retries exhausted");
                            return Err(GatewayError::RetriesExhausted {
                                attempts: retry,
                                last: err,
                            });
                        }
                    }
                }
                other => return other,
            }
        }
    }

    async fn submit<T, F, Fut>(
        &self,
        request: F,
        rate_limit_is_failure: bool,
    ) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            return Err(GatewayError::Closed);
        }

        if let Err(retry_in) = self.breaker.check() {
            self.metrics.circuit_rejected();
            debug!(
                retry_in_secs = retry_in.as_secs(),
                "Gateway rejected request: circuit open"
            );
            return Err(GatewayError::CircuitOpen { retry_in });
        }

        let (reply, response) = oneshot::channel();
        let job: Job = Box::new(PendingRequest {
            request,
            reply,
            rate_limit_is_failure,
            breaker: Arc::clone(&self.breaker),
            metrics: Arc::clone(&self.metrics),
        });

        self.state.lock().pending += 1;
        if self.sender.send(job).is_err() {
            self.state.lock().dequeued();
            return Err(GatewayError::Closed);
        }
        self.metrics.request_enqueued();

        response.await.unwrap_or(Err(GatewayError::Dropped))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }

    pub fn is_circuit_open(&self) -> bool {
        self.breaker.is_open()
    }

    /// Snapshot of queue and breaker state.
    pub fn state(&self) -> GatewayStatus {
        let queue = self.state.lock();
        GatewayStatus {
            pending: queue.pending,
            processing: queue.processing,
            consecutive_failures: self.breaker.consecutive_failures(),
            circuit: self.breaker.state(),
            circuit_reset_in: self.breaker.reset_in(),
            since_last_dispatch: queue.last_dispatch.map(|t| t.elapsed()),
            shut_down: self.shutdown.is_cancelled(),
        }
    }

    /// Stops the worker after the in-flight request. Queued requests are
    /// rejected with [`GatewayError::Closed`].
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Request gateway shutting down");
            self.shutdown.cancel();
        }
    }
}

impl Drop for RequestGateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<Job>,
    min_delay: Duration,
    state: Arc<Mutex<QueueState>>,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<GatewayMetrics>,
    shutdown: CancellationToken,
) {
    debug!(min_delay_ms = min_delay.as_millis() as u64, "Request gateway worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        // Circuit may have opened while this job waited
        if let Err(retry_in) = breaker.check() {
            state.lock().dequeued();
            metrics.circuit_rejected();
            job.reject(GatewayError::CircuitOpen { retry_in });
            continue;
        }

        let ready_at = state.lock().last_dispatch.map(|last| last + min_delay);
        if let Some(ready_at) = ready_at {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    state.lock().dequeued();
                    job.reject(GatewayError::Closed);
                    break;
                }
                _ = tokio::time::sleep_until(ready_at) => {}
            }
        }

        {
            let mut queue = state.lock();
            queue.dequeued();
            queue.processing = true;
            queue.last_dispatch = Some(Instant::now());
        }
        metrics.request_dispatched();

        job.run().await;

        state.lock().processing = false;
    }

    receiver.close();
    while let Ok(job) = receiver.try_recv() {
        state.lock().dequeued();
        job.reject(GatewayError::Closed);
    }
    debug!("Request gateway worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy::ExponentialBackoff {
            max_retries,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }

    fn http_500() -> FetchError {
        FetchError::Http {
            status: 500,
            url: "http://provider".into(),
        }
    }

    fn rate_limited() -> FetchError {
        FetchError::RateLimited {
            url: "http://provider".into(),
            retry_after: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_are_paced_and_fifo() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let dispatched = Arc::new(Mutex::new(Vec::new()));

        let requests = (0..4).map(|id| {
            let dispatched = Arc::clone(&dispatched);
            gateway.enqueue(move || async move {
                dispatched.lock().push((id, Instant::now()));
                Ok::<_, FetchError>(id)
            })
        });
        let results = futures::future::join_all(requests).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let dispatched = dispatched.lock();
        let order: Vec<_> = dispatched.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        for pair in dispatched.windows(2) {
            let gap = pair[1].1 - pair[0].1;
            assert!(gap >= Duration::from_millis(DEFAULT_MIN_DELAY_MS), "gap {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opens_after_three_failures() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let result = gateway
                .enqueue(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(http_500())
                })
                .await;
            assert_eq!(result, Err(GatewayError::Request(http_500())));
        }
        assert!(gateway.is_circuit_open());

        let fourth = Arc::clone(&calls);
        let result = gateway
            .enqueue(move || async move {
                fourth.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(())
            })
            .await;
        assert!(matches!(result, Err(GatewayError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "no network call while open");
        assert_eq!(gateway.metrics().snapshot().circuit_rejections, 1);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;

        let after = Arc::clone(&calls);
        let result = gateway
            .enqueue(move || async move {
                after.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(())
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(gateway.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_then_succeeds() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result = gateway
            .enqueue_with_retry(&fast_retry(3), move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(rate_limited())
                    } else {
                        Ok("payload")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.consecutive_failures(), 0);

        let snapshot = gateway.metrics().snapshot();
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.rate_limited, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_count_as_one_failure() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result = gateway
            .enqueue_with_retry(&fast_retry(2), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(rate_limited()) }
            })
            .await;

        assert_eq!(
            result,
            Err(GatewayError::RetriesExhausted {
                attempts: 3,
                last: rate_limited()
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.consecutive_failures(), 1);
        assert!(!gateway.is_circuit_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result = gateway
            .enqueue_with_retry(&fast_retry(3), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(http_500()) }
            })
            .await;

        assert_eq!(result, Err(GatewayError::Request(http_500())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.consecutive_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatched_request_survives_dropped_caller() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            gateway.enqueue(move || async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, FetchError>(())
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(gateway.metrics().snapshot().requests_succeeded, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_requests() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        gateway.shutdown();

        let result = gateway
            .enqueue(|| async { Ok::<_, FetchError>(()) })
            .await;
        assert_eq!(result, Err(GatewayError::Closed));
        assert!(gateway.state().shut_down);
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let gateway = RequestGateway::new(GatewayConfig::default()).unwrap();
        let status = gateway.state();
        assert_eq!(status.pending, 0);
        assert!(!status.processing);
        assert_eq!(status.circuit, CircuitState::Closed);
        assert!(status.since_last_dispatch.is_none());

        gateway
            .enqueue(|| async { Ok::<_, FetchError>(()) })
            .await
            .unwrap();
        assert!(gateway.state().since_last_dispatch.is_some());
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = RequestGateway::new(GatewayConfig::default());
        assert!(matches!(result, Err(GatewayError::NoRuntime)));
    }
}
