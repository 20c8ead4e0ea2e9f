//! Circuit breaker guarding the generation backend.
//!
//! When the backend keeps timing out or answering 429/5xx, further calls are
//! rejected locally with [`UpstreamReason::CircuitOpen`] instead of queueing
//! up behind a struggling service.
//!
//! ```text
//! CLOSED --[N failures]--> OPEN --[recovery timeout]--> HALF_OPEN
//!   ^                        ^                              |
//!   |                        +---------[trial fails]--------+
//!   +----------------------[M trials succeed]---------------+
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{AppError, UpstreamReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive tripping failures before the circuit opens.
    pub failure_threshold: u32,

    /// Successful trial calls in half-open state before the circuit closes.
    pub success_threshold: u32,

    /// Time spent open before a trial call is let through.
    pub recovery_timeout: Duration,

    /// Applied to the recovery timeout each time a rate limit opens the circuit.
    pub rate_limit_backoff_multiplier: f32,

    pub max_recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
            rate_limit_backoff_multiplier: 2.0,
            max_recovery_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    trials_ok: u32,
    opened_at: Option<Instant>,
    recovery_timeout: Duration,
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug)]
pub enum CircuitBreakerError {
    /// Rejected without calling the backend.
    Open { name: String, retry_after: Duration },
    /// The wrapped call failed.
    Inner(AppError),
}

impl From<CircuitBreakerError> for AppError {
    fn from(err: CircuitBreakerError) -> Self {
        match err {
            CircuitBreakerError::Open { name, retry_after } => AppError::upstream(
                UpstreamReason::CircuitOpen,
                format!(
                    "Circuit '{name}' is open, retry after {} seconds",
                    retry_after.as_secs()
                ),
            ),
            CircuitBreakerError::Inner(e) => e,
        }
    }
}

/// Thread-safe circuit breaker; clones share state.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let inner = BreakerState {
            state: CircuitState::Closed,
            failures: 0,
            trials_ok: 0,
            opened_at: None,
            recovery_timeout: config.recovery_timeout,
        };
        Self {
            name: name.into(),
            config,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(circuit = %self.name, "Recovered from poisoned mutex");
            poisoned.into_inner()
        })
    }

    /// Current state, applying a pending Open → HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    /// Runs `operation` unless the circuit is open.
    ///
    /// Only errors for which [`AppError::should_trip_circuit`] holds count as
    /// failures; caller mistakes never open the circuit.
    pub async fn call<F, T, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        {
            let mut inner = self.lock();
            self.maybe_half_open(&mut inner);

            if inner.state == CircuitState::Open {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                return Err(CircuitBreakerError::Open {
                    name: self.name.clone(),
                    retry_after: inner.recovery_timeout.saturating_sub(elapsed),
                });
            }
        }

        let result = operation().await;

        match &result {
            Ok(_) => self.record_success(),
            Err(e) if e.should_trip_circuit() => self.record_failure(e),
            Err(_) => {}
        }

        result.map_err(CircuitBreakerError::Inner)
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.trials_ok += 1;
                if inner.trials_ok >= self.config.success_threshold {
                    tracing::info!(circuit = %self.name, "Circuit closed after successful trial calls");
                    inner.state = CircuitState::Closed;
                    inner.failures = 0;
                    inner.trials_ok = 0;
                    inner.recovery_timeout = self.config.recovery_timeout;
                }
            }
            CircuitState::Closed => inner.failures = 0,
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, error: &AppError) {
        let mut inner = self.lock();
        let rate_limited = error.upstream_reason() == Some(UpstreamReason::RateLimited);

        let open = match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                inner.failures >= self.config.failure_threshold
            }
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if open {
            tracing::warn!(
                circuit = %self.name,
                failures = inner.failures,
                error = %error,
                "Circuit opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trials_ok = 0;
            if rate_limited {
                let extended = inner
                    .recovery_timeout
                    .mul_f32(self.config.rate_limit_backoff_multiplier);
                inner.recovery_timeout = extended.min(self.config.max_recovery_timeout);
            }
        }
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.trials_ok = 0;
        inner.opened_at = None;
        inner.recovery_timeout = self.config.recovery_timeout;
    }

    fn maybe_half_open(&self, inner: &mut BreakerState) {
        if inner.state == CircuitState::Open
            && let Some(opened_at) = inner.opened_at
            && opened_at.elapsed() >= inner.recovery_timeout
        {
            tracing::info!(circuit = %self.name, "Circuit half-open, probing");
            inner.state = CircuitState::HalfOpen;
            inner.trials_ok = 0;
        }
    }
}
