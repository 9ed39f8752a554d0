//! Error classification: severity, category, and retryability.
//!
//! Classification is an exhaustive match over the closed `TradingError`
//! enum, so every variant is handled exactly once and adding a variant
//! is a compile error until it is classified. Ordering bugs where a broad
//! check shadows a more specific one cannot occur with sum-type dispatch.

use crate::catalog::{ErrorCategory, ErrorCode, Severity};
use crate::error::TradingError;

/// Classification interface consumed by the retry executor and reporter.
///
/// Retryability is fail-closed: an error with no cataloged code is never
/// retryable. Unknown must not be treated as safe.
pub trait ErrorClass {
    /// Severity for alert prioritization. Defaults to [`Severity::Medium`]
    /// for errors outside the catalog.
    fn severity(&self) -> Severity;

    /// Best-effort mapping to a cataloged code. `None` for uncataloged
    /// error kinds; callers must handle the `None` case explicitly.
    fn error_code(&self) -> Option<ErrorCode>;

    /// Whether this error is safe to retry, per the catalog.
    fn is_retryable(&self) -> bool {
        self.error_code().map_or(false, |code| code.is_retryable())
    }

    /// Subsystem category, when cataloged.
    fn category(&self) -> Option<ErrorCategory> {
        self.error_code().map(|code| code.category())
    }
}

impl ErrorClass for TradingError {
    fn severity(&self) -> Severity {
        match self {
            // Configuration problems are fail-fast at startup
            Self::MissingEnvVar(_) | Self::InvalidConfigValue { .. } => Severity::Critical,

            Self::InsufficientFunds { .. }
            | Self::BuyingPowerExceeded { .. }
            | Self::OrderTimeout { .. } => Severity::High,

            Self::MarketClosed { .. }
            | Self::ProviderUnavailable { .. }
            | Self::NotificationFailure(_) => Severity::Medium,

            Self::RateLimited { .. } => Severity::Low,

            // Uncataloged kinds get the documented default
            Self::Io(_) | Self::Internal(_) => Severity::Medium,
        }
    }

    fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::MarketClosed { .. } => Some(ErrorCode::MarketClosed),
            Self::InsufficientFunds { .. } => Some(ErrorCode::InsufficientFunds),
            Self::OrderTimeout { .. } => Some(ErrorCode::OrderTimeout),
            Self::BuyingPowerExceeded { .. } => Some(ErrorCode::BuyingPowerExceeded),
            Self::RateLimited { .. } => Some(ErrorCode::RateLimited),
            Self::ProviderUnavailable { .. } => Some(ErrorCode::ProviderFailure),
            Self::MissingEnvVar(_) => Some(ErrorCode::MissingEnvVar),
            Self::InvalidConfigValue { .. } => Some(ErrorCode::InvalidConfigValue),
            Self::NotificationFailure(_) => Some(ErrorCode::SmtpFailure),
            Self::Io(_) | Self::Internal(_) => None,
        }
    }
}

/// Convenience free function mirroring the trait method.
pub fn classify<E: ErrorClass>(err: &E) -> Severity {
    err.severity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn rate_limited() -> TradingError {
        TradingError::RateLimited {
            retry_after: Some(Duration::from_secs(1)),
        }
    }

    #[test]
    fn severity_matches_catalog_defaults() {
        for code in ErrorCode::ALL {
            // Every cataloged code's default severity must agree with the
            // classifier for a representative error instance.
            let err = match code {
                ErrorCode::MarketClosed => TradingError::MarketClosed {
                    symbol: "BTC-USD".into(),
                },
                ErrorCode::InsufficientFunds => TradingError::InsufficientFunds {
                    required: 100.0,
                    available: 50.0,
                },
                ErrorCode::OrderTimeout => TradingError::OrderTimeout {
                    symbol: "BTC-USD".into(),
                    waited: Duration::from_secs(5),
                },
                ErrorCode::BuyingPowerExceeded => TradingError::BuyingPowerExceeded {
                    requested: 1000.0,
                    limit: 500.0,
                },
                ErrorCode::RateLimited => rate_limited(),
                ErrorCode::ProviderFailure => TradingError::ProviderUnavailable {
                    provider: "coinbase".into(),
                    reason: "503".into(),
                },
                ErrorCode::MissingEnvVar => TradingError::MissingEnvVar("API_KEY".into()),
                ErrorCode::InvalidConfigValue => TradingError::InvalidConfigValue {
                    key: "max_retries".into(),
                    reason: "negative".into(),
                },
                ErrorCode::SmtpFailure => TradingError::NotificationFailure("timeout".into()),
            };
            assert_eq!(err.error_code(), Some(*code));
            assert_eq!(err.severity(), code.spec().default_severity);
            assert_eq!(err.is_retryable(), code.is_retryable());
        }
    }

    #[test]
    fn uncataloged_errors_default_to_medium_and_not_retryable() {
        let err = TradingError::Internal("oops".into());
        assert_eq!(err.error_code(), None);
        assert_eq!(err.severity(), Severity::Medium);
        assert!(!err.is_retryable());
        assert_eq!(err.category(), None);

        let io = TradingError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(io.severity(), Severity::Medium);
        assert!(!io.is_retryable());
    }

    #[test]
    fn classification_is_deterministic() {
        let a = rate_limited();
        let b = rate_limited();
        assert_eq!(classify(&a), classify(&b));
        assert_eq!(classify(&a), classify(&a));
        assert_eq!(a.error_code(), b.error_code());
    }
}
