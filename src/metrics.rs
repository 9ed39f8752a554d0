//! Prometheus Metrics Module
//!
//! Pre-registered metrics for resilience observability. Components update
//! these on terminal events only (one per attempt or transition), never on
//! hot-loop iterations.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_gauge_vec, register_int_counter_vec, Encoder, GaugeVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // --- Retry Metrics ---

    /// Retry attempts by operation and outcome ("retried", "exhausted", "fatal", "deadline")
    pub static ref RETRY_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        opts!("tradeguard_retry_attempts_total", "Retry attempts"),
        &["operation", "outcome"]
    ).expect("FATAL: Failed to register RETRY_ATTEMPTS metric - check for duplicate registration");

    // --- Circuit Breaker Metrics ---

    /// Circuit breaker state (0=closed, 1=half_open, 2=open)
    pub static ref CIRCUIT_BREAKER_STATE: GaugeVec = register_gauge_vec!(
        opts!("tradeguard_circuit_breaker_state", "Circuit breaker state (0=closed, 1=half_open, 2=open)"),
        &["name"]
    ).expect("FATAL: Failed to register CIRCUIT_BREAKER_STATE metric - check for duplicate registration");

    /// Circuit breaker trips (transitions to open)
    pub static ref CIRCUIT_BREAKER_TRIPS: IntCounterVec = register_int_counter_vec!(
        opts!("tradeguard_circuit_breaker_trips_total", "Circuit breaker trips"),
        &["name"]
    ).expect("FATAL: Failed to register CIRCUIT_BREAKER_TRIPS metric - check for duplicate registration");

    // --- Reporter Metrics ---

    /// Errors recorded by the reporter (by category and severity)
    pub static ref ERRORS_REPORTED: IntCounterVec = register_int_counter_vec!(
        opts!("tradeguard_errors_reported_total", "Errors recorded by the reporter"),
        &["category", "severity"]
    ).expect("FATAL: Failed to register ERRORS_REPORTED metric - check for duplicate registration");

    /// Error-rate alerts emitted (after cooldown deduplication)
    pub static ref RATE_ALERTS: IntCounterVec = register_int_counter_vec!(
        opts!("tradeguard_rate_alerts_total", "Error-rate alerts emitted"),
        &["alert_key"]
    ).expect("FATAL: Failed to register RATE_ALERTS metric - check for duplicate registration");
}

/// Record one retry-loop attempt outcome.
pub fn record_retry_attempt(operation: &str, outcome: &str) {
    RETRY_ATTEMPTS
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Update the breaker state gauge (0=closed, 1=half_open, 2=open).
pub fn set_circuit_breaker_state(name: &str, state: f64) {
    CIRCUIT_BREAKER_STATE.with_label_values(&[name]).set(state);
}

/// Record a breaker trip to OPEN.
pub fn record_circuit_breaker_trip(name: &str) {
    CIRCUIT_BREAKER_TRIPS.with_label_values(&[name]).inc();
}

/// Record an error seen by the reporter.
pub fn record_error(category: &str, severity: &str) {
    ERRORS_REPORTED
        .with_label_values(&[category, severity])
        .inc();
}

/// Record an emitted rate alert.
pub fn record_rate_alert(alert_key: &str) {
    RATE_ALERTS.with_label_values(&[alert_key]).inc();
}

/// Get metrics as text for a /metrics endpoint.
///
/// Handles encoding errors gracefully instead of panicking.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode Prometheus metrics: {}", e);
        return String::new();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Prometheus metrics buffer is not valid UTF-8: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_retry_attempt() {
        record_retry_attempt("place_order", "retried");
        // Metric should be incremented (we can't easily assert on prometheus counters)
    }

    #[test]
    fn test_gather_metrics() {
        // Trigger lazy initialization of at least one metric
        record_error("trading", "high");

        let output = gather_metrics();
        assert!(
            output.contains("tradeguard") || output.contains("errors_reported"),
            "Expected metrics output to contain 'tradeguard' or 'errors_reported', got: {}",
            &output[..output.len().min(200)]
        );
    }
}
