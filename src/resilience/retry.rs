//! Retry executor with exponential backoff.
//!
//! Wraps an async operation and re-invokes it on retryable failures, up to
//! `max_retries` additional attempts. Retryability comes from the error's
//! own classification ([`ErrorClass`]) — a narrow allow-list driven by the
//! error catalog, never a blanket catch-all.

use crate::classify::ErrorClass;
use crate::metrics;
use crate::resilience::backoff::{self, BackoffConfig};
use rand::Rng;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::warn;

/// Terminal outcome of a retry loop that did not produce a success.
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Debug + fmt::Display> {
    /// The error was not retryable; the operation ran exactly once.
    #[error("non-retryable error: {0}")]
    Fatal(E),

    /// Every attempt failed with a retryable error.
    #[error("retries exhausted after {attempts} attempts: {error}")]
    Exhausted { attempts: u32, error: E },

    /// The caller's deadline would be crossed by the next backoff sleep.
    /// Distinct from `Exhausted` so callers can tell "gave up waiting"
    /// from "operation itself kept failing".
    #[error("deadline exceeded after {attempts} attempts; last error: {last_error}")]
    DeadlineExceeded { attempts: u32, last_error: E },
}

impl<E: fmt::Debug + fmt::Display> RetryError<E> {
    /// The underlying operation error, whichever way the loop ended.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { error, .. } => error,
            RetryError::DeadlineExceeded { last_error, .. } => last_error,
        }
    }
}

/// Stateless executor wrapping operations in a bounded retry loop.
///
/// Cloneable and cheap; one per call site or shared, it makes no difference.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: BackoffConfig,
    /// Operation label for logs and metrics
    operation: String,
}

impl RetryExecutor {
    pub fn new(operation: impl Into<String>, config: BackoffConfig) -> Self {
        Self {
            config,
            operation: operation.into(),
        }
    }

    /// Run `op`, retrying on retryable failures with backoff between attempts.
    ///
    /// Attempt 0 runs immediately. Non-retryable errors propagate at once as
    /// [`RetryError::Fatal`] without consuming a retry slot. After
    /// `max_retries + 1` failed attempts the last error is returned as
    /// [`RetryError::Exhausted`] annotated with the attempt count.
    ///
    /// The backoff sleep is the only suspension point and is cancellable by
    /// dropping the returned future (e.g. under `tokio::select!` or
    /// `tokio::time::timeout`).
    ///
    /// The operation must be idempotent or the caller must accept
    /// at-least-once semantics; no deduplication happens here.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        E: ErrorClass + fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(op, None).await
    }

    /// Like [`execute`](Self::execute), but aborts once the next backoff
    /// sleep would cross `deadline`, without sleeping further.
    pub async fn execute_with_deadline<T, E, F, Fut>(
        &self,
        op: F,
        deadline: tokio::time::Instant,
    ) -> Result<T, RetryError<E>>
    where
        E: ErrorClass + fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(op, Some(deadline)).await
    }

    async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<T, RetryError<E>>
    where
        E: ErrorClass + fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        // The loop has no exit other than the returns below, so there is no
        // post-loop "exhausted" path to keep in sync.
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!(
                        operation = %self.operation,
                        attempts = attempt + 1,
                        error = %e,
                        "non-retryable failure, giving up"
                    );
                    metrics::record_retry_attempt(&self.operation, "fatal");
                    return Err(RetryError::Fatal(e));
                }
                Err(e) if attempt >= self.config.max_retries => {
                    warn!(
                        operation = %self.operation,
                        attempts = attempt + 1,
                        error = %e,
                        "retries exhausted, giving up"
                    );
                    metrics::record_retry_attempt(&self.operation, "exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt + 1,
                        error: e,
                    });
                }
                Err(e) => {
                    let draw = rand::rng().random_range(0.5..=1.0);
                    let delay = backoff::delay(attempt, &self.config, draw);

                    if let Some(deadline) = deadline {
                        if tokio::time::Instant::now() + delay >= deadline {
                            warn!(
                                operation = %self.operation,
                                attempts = attempt + 1,
                                error = %e,
                                "deadline would be crossed by backoff, giving up"
                            );
                            metrics::record_retry_attempt(&self.operation, "deadline");
                            return Err(RetryError::DeadlineExceeded {
                                attempts: attempt + 1,
                                last_error: e,
                            });
                        }
                    }

                    // One event per attempt, never per loop iteration elsewhere
                    warn!(
                        operation = %self.operation,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retryable failure, backing off"
                    );
                    metrics::record_retry_attempt(&self.operation, "retried");

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
