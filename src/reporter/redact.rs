//! Context redaction for error events.
//!
//! Anything stored in an [`ErrorEvent`](super::ErrorEvent) or handed to a
//! notifier passes through here first. Keys matching the denylist are
//! replaced with [`REDACTION_MARKER`] at any nesting depth, including inside
//! arrays of objects. This is mandatory, not best-effort: event context
//! routinely carries request payloads that may embed credentials.

use serde_json::{Map, Value};

/// Replacement for denylisted values.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Keys whose values are never stored or forwarded. Matched case-insensitively.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "api_key",
    "secret",
    "auth",
    "authorization",
    "credentials",
    "account_id",
];

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|denied| key.eq_ignore_ascii_case(denied))
}

/// Redact a context map in place, recursing into nested objects and arrays.
pub fn redact_map(map: &mut Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        if is_sensitive(key) {
            *value = Value::String(REDACTION_MARKER.to_string());
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_map(map),
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value(item);
            }
        }
        _ => {}
    }
}
