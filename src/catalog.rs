//! # Error Catalog
//!
//! Static catalog mapping machine-readable error codes to remediation
//! metadata. Every `ErrorCode` has exactly one `ErrorSpec`; totality is
//! guaranteed by exhaustive matching and verified by the tests below.
//!
//! Code format: `<SUBSYSTEM>_<CONDITION>`, e.g. `TRD_MARKET_CLOSED`.
//!
//! | Prefix | Category      |
//! |--------|---------------|
//! | TRD    | Trading       |
//! | DATA   | Market data   |
//! | CONF   | Configuration |
//! | NOTIF  | Notification  |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered severity level used to prioritize alerting and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Subsystem category an error code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Trading,
    Data,
    Configuration,
    Notification,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Trading => write!(f, "trading"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Notification => write!(f, "notification"),
        }
    }
}

/// Closed enumeration of cataloged error codes.
///
/// The set is fixed at compile time; adding a variant forces the
/// `spec()` match (and therefore the catalog) to be extended. The serde
/// renames keep the serialized form identical to [`ErrorCode::as_str`],
/// so an event never carries two spellings of the same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Order rejected because the market is closed
    #[serde(rename = "TRD_MARKET_CLOSED")]
    MarketClosed,
    /// Account lacks funds to cover the order
    #[serde(rename = "TRD_INSUFFICIENT_FUNDS")]
    InsufficientFunds,
    /// Order placement or fill confirmation timed out
    #[serde(rename = "TRD_ORDER_TIMEOUT")]
    OrderTimeout,
    /// Order exceeds the account's buying power limit
    #[serde(rename = "TRD_BUYING_POWER")]
    BuyingPowerExceeded,
    /// Data provider throttled the request
    #[serde(rename = "DATA_RATE_LIMIT")]
    RateLimited,
    /// Data provider returned an error or was unreachable
    #[serde(rename = "DATA_PROVIDER_FAILURE")]
    ProviderFailure,
    /// Required environment variable is not set
    #[serde(rename = "CONF_MISSING_ENV")]
    MissingEnvVar,
    /// Configuration value failed validation
    #[serde(rename = "CONF_INVALID_VALUE")]
    InvalidConfigValue,
    /// Notification delivery over SMTP failed
    #[serde(rename = "NOTIF_SMTP_FAILURE")]
    SmtpFailure,
}

/// Immutable remediation metadata for one [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorSpec {
    pub category: ErrorCategory,
    pub default_severity: Severity,
    pub retryable: bool,
    pub message: &'static str,
    pub suggested_action: &'static str,
    pub doc_url: Option<&'static str>,
}

impl ErrorCode {
    /// Every cataloged code, for exhaustiveness checks and tooling.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::MarketClosed,
        ErrorCode::InsufficientFunds,
        ErrorCode::OrderTimeout,
        ErrorCode::BuyingPowerExceeded,
        ErrorCode::RateLimited,
        ErrorCode::ProviderFailure,
        ErrorCode::MissingEnvVar,
        ErrorCode::InvalidConfigValue,
        ErrorCode::SmtpFailure,
    ];

    /// Machine-readable code string, e.g. `TRD_MARKET_CLOSED`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MarketClosed => "TRD_MARKET_CLOSED",
            ErrorCode::InsufficientFunds => "TRD_INSUFFICIENT_FUNDS",
            ErrorCode::OrderTimeout => "TRD_ORDER_TIMEOUT",
            ErrorCode::BuyingPowerExceeded => "TRD_BUYING_POWER",
            ErrorCode::RateLimited => "DATA_RATE_LIMIT",
            ErrorCode::ProviderFailure => "DATA_PROVIDER_FAILURE",
            ErrorCode::MissingEnvVar => "CONF_MISSING_ENV",
            ErrorCode::InvalidConfigValue => "CONF_INVALID_VALUE",
            ErrorCode::SmtpFailure => "NOTIF_SMTP_FAILURE",
        }
    }

    /// Full catalog entry for this code. Total over the enum.
    pub const fn spec(&self) -> ErrorSpec {
        match self {
            ErrorCode::MarketClosed => ErrorSpec {
                category: ErrorCategory::Trading,
                default_severity: Severity::Medium,
                retryable: false,
                message: "Market is closed for the requested instrument",
                suggested_action: "Queue the order for the next session or use extended-hours routing",
                doc_url: None,
            },
            ErrorCode::InsufficientFunds => ErrorSpec {
                category: ErrorCategory::Trading,
                default_severity: Severity::High,
                retryable: false,
                message: "Account balance cannot cover the order value",
                suggested_action: "Reduce order size or deposit funds before resubmitting",
                doc_url: None,
            },
            ErrorCode::OrderTimeout => ErrorSpec {
                category: ErrorCategory::Trading,
                default_severity: Severity::High,
                retryable: true,
                message: "Order was not acknowledged within the expected window",
                suggested_action: "Verify order status with the broker before retrying to avoid duplicates",
                doc_url: None,
            },
            ErrorCode::BuyingPowerExceeded => ErrorSpec {
                category: ErrorCategory::Trading,
                default_severity: Severity::High,
                retryable: false,
                message: "Order exceeds available buying power",
                suggested_action: "Reduce order size or review margin settings",
                doc_url: None,
            },
            ErrorCode::RateLimited => ErrorSpec {
                category: ErrorCategory::Data,
                default_severity: Severity::Low,
                retryable: true,
                message: "Data provider throttled the request",
                suggested_action: "Back off and retry; consider lowering the request rate",
                doc_url: None,
            },
            ErrorCode::ProviderFailure => ErrorSpec {
                category: ErrorCategory::Data,
                default_severity: Severity::Medium,
                retryable: true,
                message: "Data provider request failed",
                suggested_action: "Retry with backoff; check provider status page if failures persist",
                doc_url: None,
            },
            ErrorCode::MissingEnvVar => ErrorSpec {
                category: ErrorCategory::Configuration,
                default_severity: Severity::Critical,
                retryable: false,
                message: "Required environment variable is not set",
                suggested_action: "Set the variable and restart; startup must fail fast on missing config",
                doc_url: None,
            },
            ErrorCode::InvalidConfigValue => ErrorSpec {
                category: ErrorCategory::Configuration,
                default_severity: Severity::Critical,
                retryable: false,
                message: "Configuration value failed validation",
                suggested_action: "Correct the value and restart; do not run with a partial config",
                doc_url: None,
            },
            ErrorCode::SmtpFailure => ErrorSpec {
                category: ErrorCategory::Notification,
                default_severity: Severity::Medium,
                retryable: true,
                message: "Failed to deliver notification over SMTP",
                suggested_action: "Check SMTP credentials and connectivity; alerts may be delayed",
                doc_url: None,
            },
        }
    }

    /// Category shortcut, avoids building the full spec.
    pub const fn category(&self) -> ErrorCategory {
        self.spec().category
    }

    /// Whether the catalog marks this code as safe to retry.
    pub const fn is_retryable(&self) -> bool {
        self.spec().retryable
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_total() {
        for code in ErrorCode::ALL {
            let spec = code.spec();
            assert!(!spec.message.is_empty(), "{code} has empty message");
            assert!(
                !spec.suggested_action.is_empty(),
                "{code} has empty suggested_action"
            );
        }
    }

    #[test]
    fn code_strings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate code {code}");
        }
        assert_eq!(seen.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn configuration_codes_are_critical_and_fatal() {
        for code in [ErrorCode::MissingEnvVar, ErrorCode::InvalidConfigValue] {
            let spec = code.spec();
            assert_eq!(spec.category, ErrorCategory::Configuration);
            assert_eq!(spec.default_severity, Severity::Critical);
            assert!(!spec.retryable);
        }
    }

    #[test]
    fn transient_codes_are_retryable() {
        assert!(ErrorCode::RateLimited.is_retryable());
        assert!(ErrorCode::ProviderFailure.is_retryable());
        assert!(ErrorCode::OrderTimeout.is_retryable());
        assert!(!ErrorCode::InsufficientFunds.is_retryable());
        assert!(!ErrorCode::MarketClosed.is_retryable());
    }

    #[test]
    fn serialized_form_matches_wire_string() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));

            let parsed: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, *code);
        }
        assert_eq!(ErrorCode::MarketClosed.to_string(), "TRD_MARKET_CLOSED");
    }
}
