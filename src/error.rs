//! Domain error types for the trading platform's shared error layer.
//!
//! `TradingError` is the closed hierarchy the classifier dispatches over.
//! Keeping it a single sum type (rather than a family of base/sub types)
//! makes classification exhaustive at compile time.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by trading operations and their collaborators.
#[derive(Debug, Error)]
pub enum TradingError {
    /// Order rejected because the market is closed
    #[error("market is closed for {symbol}")]
    MarketClosed { symbol: String },

    /// Account lacks funds to cover the order
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },

    /// Order placement or fill confirmation timed out
    #[error("order for {symbol} timed out after {waited:?}")]
    OrderTimeout { symbol: String, waited: Duration },

    /// Order exceeds the account's buying power limit
    #[error("buying power exceeded: requested {requested}, limit {limit}")]
    BuyingPowerExceeded { requested: f64, limit: f64 },

    /// Data provider throttled the request
    #[error("rate limited by provider{}", retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// Data provider returned an error or was unreachable
    #[error("provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// Required environment variable is not set
    #[error("environment variable {0} must be set")]
    MissingEnvVar(String),

    /// Configuration value failed validation
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfigValue { key: String, reason: String },

    /// Notification delivery failed
    #[error("notification delivery failed: {0}")]
    NotificationFailure(String),

    /// I/O error (file operations, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors from validating resilience configuration at construction time.
///
/// These are fail-fast: a process must not start with an invalid
/// `BackoffConfig` or `CircuitBreakerConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base_delay must be greater than zero")]
    ZeroBaseDelay,

    #[error("max_delay ({max_delay:?}) must be >= base_delay ({base_delay:?})")]
    MaxBelowBase {
        base_delay: Duration,
        max_delay: Duration,
    },

    #[error("multiplier must be > 1.0, got {0}")]
    MultiplierTooSmall(f64),

    #[error("failure_threshold must be greater than zero")]
    ZeroFailureThreshold,

    #[error("reset_timeout must be greater than zero")]
    ZeroResetTimeout,
}
