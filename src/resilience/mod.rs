//! # Resilience Module
//!
//! Reusable resilience patterns for wrapping calls to flaky dependencies.
//!
//! ## Components
//! - `BackoffConfig` / `delay`: pure exponential-backoff math with injectable jitter.
//! - `RetryExecutor`: bounded retry loop over retryable failures.
//! - `CircuitBreaker`: blocks calls to a dependency after threshold failures.
//!
//! The executor and the breaker compose by wrapping order chosen at the call
//! site; neither knows about the other.

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

// Re-export for convenience
pub use backoff::{delay, raw_delay, BackoffConfig};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitOpenError, CircuitState,
};
pub use retry::{RetryError, RetryExecutor};
