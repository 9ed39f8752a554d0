//! # tradeguard
//!
//! Resilience and error-handling primitives for trading systems: retry with
//! exponential backoff, a circuit breaker, error classification against a
//! static catalog, and a windowed error reporter with rate alerting.
//!
//! The pieces are independent and compose by wrapping order at the call
//! site; typical layering is breaker outside, retry inside:
//!
//! ```ignore
//! let breaker = CircuitBreaker::new("alpaca", CircuitBreakerConfig::new(5, Duration::from_secs(60))?);
//! let retry = RetryExecutor::new("place_order", BackoffConfig::default());
//!
//! let result = breaker
//!     .call(|| retry.execute(|| client.place_order(&order)))
//!     .await;
//! ```

pub mod catalog;
pub mod classify;
pub mod error;
pub mod metrics;
pub mod reporter;
pub mod resilience;

pub use catalog::{ErrorCategory, ErrorCode, ErrorSpec, Severity};
pub use classify::{classify, ErrorClass};
pub use error::{ConfigError, TradingError};
pub use reporter::{ErrorEvent, ErrorReporter, ErrorSummary, Notifier, NotifyError, ReporterConfig};
pub use resilience::{
    BackoffConfig, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitOpenError,
    CircuitState, RetryError, RetryExecutor,
};
