use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::error::CircuitOpenError;
use crate::provider::{Provider, ReviewRequest, ReviewResponse};

const OPEN_TIMEOUT: Duration = Duration::from_secs(30);
const HALF_OPEN_MAX_REQUESTS: u32 = 3;
const TRIP_CONSECUTIVE_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: State,
    consecutive_failures: u32,
    half_open_inflight: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

/// Three-state circuit breaker around a model provider.
///
/// Closed until more than five consecutive failures, then open for 30 s;
/// half-open admits up to three probes and closes again after three straight
/// successes. Open and over-probed calls fail fast with [`CircuitOpenError`].
pub struct CircuitBreakerProvider {
    inner: Arc<dyn Provider>,
    state: Mutex<BreakerState>,
    open_timeout: Duration,
}

impl CircuitBreakerProvider {
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self {
            inner,
            state: Mutex::new(BreakerState {
                state: State::Closed,
                consecutive_failures: 0,
                half_open_inflight: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
            open_timeout: OPEN_TIMEOUT,
        }
    }

    /// Shortens the open window; used by tests.
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    fn admit(&self) -> Result<(), CircuitOpenError> {
        let mut guard = self.lock();
        match guard.state {
            State::Closed => Ok(()),
            State::Open => {
                let expired = guard
                    .opened_at
                    .map(|at| at.elapsed() >= self.open_timeout)
                    .unwrap_or(true);
                if !expired {
                    return Err(CircuitOpenError);
                }
                guard.state = State::HalfOpen;
                guard.half_open_inflight = 1;
                guard.half_open_successes = 0;
                Ok(())
            }
            State::HalfOpen => {
                if guard.half_open_inflight >= HALF_OPEN_MAX_REQUESTS {
                    return Err(CircuitOpenError);
                }
                guard.half_open_inflight += 1;
                Ok(())
            }
        }
    }

    fn on_success(&self) {
        let mut guard = self.lock();
        match guard.state {
            State::Closed => guard.consecutive_failures = 0,
            State::HalfOpen => {
                guard.half_open_inflight = guard.half_open_inflight.saturating_sub(1);
                guard.half_open_successes += 1;
                if guard.half_open_successes >= HALF_OPEN_MAX_REQUESTS {
                    guard.state = State::Closed;
                    guard.consecutive_failures = 0;
                    guard.opened_at = None;
                }
            }
            State::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut guard = self.lock();
        match guard.state {
            State::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures > TRIP_CONSECUTIVE_FAILURES {
                    warn!("circuit breaker opened after repeated provider failures");
                    open(&mut guard);
                }
            }
            State::HalfOpen => {
                warn!("circuit breaker reopened by a failed probe");
                open(&mut guard);
            }
            State::Open => {}
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open(guard: &mut BreakerState) {
    guard.state = State::Open;
    guard.opened_at = Some(Instant::now());
    guard.consecutive_failures = 0;
    guard.half_open_inflight = 0;
    guard.half_open_successes = 0;
}

#[async_trait]
impl Provider for CircuitBreakerProvider {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewResponse> {
        self.admit()?;

        match self.inner.review(request).await {
            Ok(response) => {
                self.on_success();
                Ok(response)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use super::*;

    struct FlakyProvider {
        failing: AtomicBool,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failing: bool) -> Arc<Self> {
            Arc::new(Self {
                failing: AtomicBool::new(failing),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        async fn review(&self, _request: &ReviewRequest) -> Result<ReviewResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(anyhow::anyhow!("backend down"))
            } else {
                Ok(ReviewResponse::default())
            }
        }
    }

    fn request() -> ReviewRequest {
        ReviewRequest {
            file: "main.go".to_string(),
            content: "+x\n".to_string(),
        }
    }

    #[tokio::test]
    async fn trips_after_six_consecutive_failures() {
        let backend = FlakyProvider::new(true);
        let breaker = CircuitBreakerProvider::new(backend.clone());

        for _ in 0..6 {
            assert!(breaker.review(&request()).await.is_err());
        }
        let calls_before = backend.calls.load(Ordering::SeqCst);
        assert_eq!(calls_before, 6);

        // Open: fails fast without reaching the backend.
        let err = breaker.review(&request()).await.expect_err("open");
        assert!(err.is::<CircuitOpenError>());
        assert_eq!(backend.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn stays_closed_when_failures_are_not_consecutive() {
        let backend = FlakyProvider::new(true);
        let breaker = CircuitBreakerProvider::new(backend.clone());

        for _ in 0..5 {
            assert!(breaker.review(&request()).await.is_err());
        }
        backend.failing.store(false, Ordering::SeqCst);
        assert!(breaker.review(&request()).await.is_ok());

        backend.failing.store(true, Ordering::SeqCst);
        for _ in 0..5 {
            let err = breaker.review(&request()).await.expect_err("failure");
            assert!(!err.is::<CircuitOpenError>(), "breaker tripped too early");
        }
    }

    #[tokio::test]
    async fn recovers_through_half_open_probes() {
        let backend = FlakyProvider::new(true);
        let breaker = CircuitBreakerProvider::new(backend.clone())
            .with_open_timeout(Duration::from_millis(5));

        for _ in 0..6 {
            assert!(breaker.review(&request()).await.is_err());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        backend.failing.store(false, Ordering::SeqCst);
        for _ in 0..3 {
            assert!(breaker.review(&request()).await.is_ok());
        }

        // Back to closed: failures count from zero again.
        backend.failing.store(true, Ordering::SeqCst);
        let err = breaker.review(&request()).await.expect_err("failure");
        assert!(!err.is::<CircuitOpenError>());
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let backend = FlakyProvider::new(true);
        let breaker = CircuitBreakerProvider::new(backend.clone())
            .with_open_timeout(Duration::from_millis(5));

        for _ in 0..6 {
            assert!(breaker.review(&request()).await.is_err());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Probe fails: straight back to open.
        assert!(breaker.review(&request()).await.is_err());
        let err = breaker.review(&request()).await.expect_err("open again");
        assert!(err.is::<CircuitOpenError>());
    }
}
