//! # Circuit Breaker Pattern
//!
//! The Circuit Breaker pattern prevents cascading failures by temporarily
//! blocking requests to a failing dependency, allowing it time to recover.
//!
//! ## States
//! - **Closed**: Normal operation, calls pass through.
//! - **Open**: Calls are rejected after `failure_threshold` consecutive failures.
//! - **HalfOpen**: After `reset_timeout`, exactly one trial call is allowed.
//!
//! Failure classification inside the breaker is binary; it does not care
//! *why* an operation failed, only that it did. Retryable/fatal distinctions
//! belong to the retry executor.
//!
//! ## Usage
//! ```ignore
//! let breaker = CircuitBreaker::new("alpaca", CircuitBreakerConfig::default()?);
//!
//! match breaker.call(|| client.place_order(&order)).await {
//!     Ok(ack) => handle(ack),
//!     Err(CircuitBreakerError::Open(e)) => fallback(e),
//!     Err(CircuitBreakerError::Inner(e)) => log_failure(e),
//! }
//! ```

use crate::error::ConfigError;
use crate::metrics;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - calls pass through
    Closed,
    /// Rejecting calls due to recent failures
    Open,
    /// Testing if the dependency recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

impl CircuitState {
    /// Gauge encoding shared with the metrics module.
    fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

/// Configuration for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker
    pub failure_threshold: u32,
    /// Cooldown before a trial call is allowed
    pub reset_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Build a validated config. Invariants: `failure_threshold > 0`,
    /// `reset_timeout > 0`.
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Result<Self, ConfigError> {
        if failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if reset_timeout.is_zero() {
            return Err(ConfigError::ZeroResetTimeout);
        }
        Ok(Self {
            failure_threshold,
            reset_timeout,
        })
    }
}

/// Raised by the breaker itself when rejecting a call while open.
///
/// Deliberately a distinct type from the wrapped operation's errors so
/// callers can fall back immediately instead of logging a real failure.
#[derive(Debug, Error)]
#[error("circuit '{breaker}' is open, retry after {retry_after:?}")]
pub struct CircuitOpenError {
    /// Name of the breaker that rejected the call
    pub breaker: String,
    /// Remaining cooldown at rejection time
    pub retry_after: Duration,
}

/// Outcome of [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E: fmt::Debug + fmt::Display> {
    /// The breaker rejected the call without invoking the operation
    #[error("{0}")]
    Open(#[from] CircuitOpenError),

    /// The operation ran and failed with its own error
    #[error("{0}")]
    Inner(E),
}

/// Mutable state guarded as one unit so transitions are atomic relative to
/// concurrent callers. Never shared across breaker instances.
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// A HALF_OPEN trial call is currently in flight
    trial_in_flight: bool,
}

/// Admission ticket for one call through the breaker.
///
/// Dropping the permit without recording an outcome means the call's future
/// was cancelled mid-flight. An abandoned HALF_OPEN trial is treated as a
/// failed trial (the circuit reopens with a fresh cooldown) so the trial
/// slot can never leak and wedge the breaker. A cancelled call in the
/// Closed state records nothing; cancellation is not a dependency failure.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    outcome_recorded: bool,
}

impl CallPermit<'_> {
    fn success(mut self) {
        self.outcome_recorded = true;
        self.breaker.on_success();
    }

    fn failure(mut self) {
        self.outcome_recorded = true;
        self.breaker.on_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.outcome_recorded && self.trial {
            self.breaker.on_trial_abandoned();
        }
    }
}

/// Circuit breaker guarding one logical dependency.
///
/// One instance per downstream service, shared across callers via `Arc`.
/// The wrapped operation runs outside the internal lock; only the
/// read-modify-write of the state tuple is serialized.
pub struct CircuitBreaker {
    /// Label for logs and metrics
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Creates a breaker in the Closed state with zero failures.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        metrics::set_circuit_breaker_state(&name, CircuitState::Closed.as_gauge());
        Self {
            name,
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns the current consecutive-failure count.
    pub fn failure_count(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Resets the breaker to its initial closed state.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let old = inner.state;
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        if old != CircuitState::Closed {
            self.log_transition(old, CircuitState::Closed, 0);
        }
    }

    /// Run `op` through the breaker.
    ///
    /// While Open and within `reset_timeout`, fails fast with
    /// [`CircuitOpenError`] and never invokes the operation. Once the
    /// timeout elapses, exactly one trial call is admitted; concurrent
    /// callers during the trial are rejected until it resolves.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, CircuitBreakerError<E>>
    where
        E: fmt::Debug + fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.admit()?;

        // Lock is not held while the operation runs; if the future is
        // dropped here the permit's Drop releases the trial slot
        let result = op().await;

        match result {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(e) => {
                permit.failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Decide whether a call may proceed, applying the Open -> HalfOpen
    /// transition when the cooldown has elapsed.
    fn admit(&self) -> Result<CallPermit<'_>, CircuitOpenError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(self.permit(false)),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.reset_timeout {
                    let failures = inner.consecutive_failures;
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    drop(inner);
                    self.log_transition(CircuitState::Open, CircuitState::HalfOpen, failures);
                    Ok(self.permit(true))
                } else {
                    Err(CircuitOpenError {
                        breaker: self.name.clone(),
                        retry_after: self.config.reset_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    // Another caller owns the trial; reject until it resolves
                    Err(CircuitOpenError {
                        breaker: self.name.clone(),
                        retry_after: Duration::ZERO,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(self.permit(true))
                }
            }
        }
    }

    fn permit(&self, trial: bool) -> CallPermit<'_> {
        CallPermit {
            breaker: self,
            trial,
            outcome_recorded: false,
        }
    }

    /// A trial permit was dropped without an outcome: the trial future was
    /// cancelled. Count it as a failed trial so the slot is released and
    /// the cooldown restarts.
    fn on_trial_abandoned(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen && inner.trial_in_flight {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trial_in_flight = false;
            let failures = inner.consecutive_failures;
            drop(inner);
            self.log_transition(CircuitState::HalfOpen, CircuitState::Open, failures);
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        let old = inner.state;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        if old != CircuitState::Closed {
            inner.state = CircuitState::Closed;
            drop(inner);
            self.log_transition(old, CircuitState::Closed, 0);
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        let old = inner.state;
        match old {
            CircuitState::HalfOpen => {
                // Failed trial reopens the circuit with a fresh cooldown
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
                let failures = inner.consecutive_failures;
                drop(inner);
                self.log_transition(CircuitState::HalfOpen, CircuitState::Open, failures);
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    let failures = inner.consecutive_failures;
                    drop(inner);
                    self.log_transition(CircuitState::Closed, CircuitState::Open, failures);
                }
            }
            CircuitState::Open => {
                // Failure recorded while already open (late completion of a
                // call admitted before the trip); keep counting, no transition
                inner.consecutive_failures += 1;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // A poisoned lock means a panic mid-transition; the state tuple is
        // always written consistently, so continuing with it is sound.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// One observability event per state transition, never one per call.
    fn log_transition(&self, from: CircuitState, to: CircuitState, failures: u32) {
        metrics::set_circuit_breaker_state(&self.name, to.as_gauge());
        match to {
            CircuitState::Open => {
                metrics::record_circuit_breaker_trip(&self.name);
                warn!(
                    breaker = %self.name,
                    from = %from,
                    to = %to,
                    consecutive_failures = failures,
                    "circuit breaker opened"
                );
            }
            _ => {
                info!(
                    breaker = %self.name,
                    from = %from,
                    to = %to,
                    consecutive_failures = failures,
                    "circuit breaker state transition"
                );
            }
        }
    }
}
