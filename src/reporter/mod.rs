//! # Error Reporter
//!
//! Aggregates error events over a sliding time window, tracks per-key
//! counts, raises rate alerts with cooldown deduplication, and forwards
//! critical errors to a pluggable notification backend.
//!
//! A reporter is constructed explicitly and passed by reference (typically
//! `Arc<ErrorReporter>`); there is no global singleton. Internal state is a
//! single mutex-guarded block, never held across `.await`.

pub mod redact;
pub mod throttle;

use crate::catalog::{ErrorCode, Severity};
use crate::classify::ErrorClass;
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

pub use redact::{redact_map, REDACTION_MARKER, SENSITIVE_KEYS};
pub use throttle::AlertThrottle;

/// Error type for notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Pluggable alerting backend for critical errors.
///
/// Delivery semantics (queueing, retry) are the implementor's concern; the
/// reporter hands off once per critical error and logs delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        error_type: &str,
        message: &str,
        context: &Map<String, Value>,
    ) -> Result<(), NotifyError>;
}

/// One recorded failure, with redacted context.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub timestamp: DateTime<Utc>,
    pub error_type: String,
    pub code: Option<ErrorCode>,
    pub severity: Severity,
    pub message: String,
    pub context: Map<String, Value>,
    pub operation: Option<String>,
    pub correlation_id: Option<String>,
}

/// Read-only snapshot returned by [`ErrorReporter::summary`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    /// Distinct (error_type, operation) keys tracked
    pub total_types: usize,
    /// Full counter map
    pub counts_by_key: HashMap<String, u64>,
    /// Events currently inside the window
    pub recent_count: usize,
    /// Windowed error rate
    pub rate_per_minute: f64,
    /// Highest-count keys, descending
    pub top: Vec<(String, u64)>,
}

/// Configuration for [`ErrorReporter`].
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Sliding window for rate computation
    pub window: Duration,
    /// Rate above which an alert is raised
    pub rate_threshold_per_min: f64,
    /// Minimum spacing between rate alerts
    pub alert_cooldown: Duration,
    /// Bound on the long-lived counter map
    pub max_counter_keys: usize,
    /// Entries in `summary().top`
    pub top_n: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
            rate_threshold_per_min: 10.0,
            alert_cooldown: Duration::from_secs(300),
            max_counter_keys: 1024,
            top_n: 5,
        }
    }
}

/// Buffer entry pairs the monotonic arrival time (window math) with the
/// event (wall-clock timestamp for humans).
struct BufferedEvent {
    arrived: Instant,
    event: ErrorEvent,
}

struct ReporterInner {
    events: VecDeque<BufferedEvent>,
    counters: HashMap<String, u64>,
    throttle: AlertThrottle,
}

/// Windowed error aggregator with rate alerting and critical-error handoff.
pub struct ErrorReporter {
    config: ReporterConfig,
    inner: Mutex<ReporterInner>,
    notifier: Option<Arc<dyn Notifier>>,
}

const RATE_ALERT_KEY: &str = "error_rate";

impl ErrorReporter {
    pub fn new(config: ReporterConfig) -> Self {
        Self::build(config, None)
    }

    /// Reporter that forwards critical errors to `notifier`.
    pub fn with_notifier(config: ReporterConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::build(config, Some(notifier))
    }

    fn build(config: ReporterConfig, notifier: Option<Arc<dyn Notifier>>) -> Self {
        let throttle = AlertThrottle::new(config.alert_cooldown);
        Self {
            config,
            inner: Mutex::new(ReporterInner {
                events: VecDeque::new(),
                counters: HashMap::new(),
                throttle,
            }),
            notifier,
        }
    }

    /// Record a failure.
    ///
    /// Redacts `context`, stores the event in the window buffer, bumps the
    /// `(error_type, operation)` counter, evicts expired events, checks the
    /// rate alert, and — when `is_critical` — forwards the redacted event to
    /// the notifier. Notifier failures are logged, never propagated.
    pub async fn report<E>(
        &self,
        err: &E,
        context: Map<String, Value>,
        is_critical: bool,
        operation: Option<&str>,
    ) where
        E: ErrorClass + fmt::Debug + fmt::Display,
    {
        let mut context = context;
        redact_map(&mut context);

        let correlation_id = context
            .get("correlation_id")
            .and_then(Value::as_str)
            .map(String::from);

        let code = err.error_code();
        let severity = err.severity();
        let error_type = error_type_of(err);
        let event = ErrorEvent {
            timestamp: Utc::now(),
            error_type: error_type.clone(),
            code,
            severity,
            message: err.to_string(),
            context,
            operation: operation.map(String::from),
            correlation_id,
        };

        let category = code.map(|c| c.category().to_string());
        metrics::record_error(
            category.as_deref().unwrap_or("uncataloged"),
            &severity.to_string(),
        );

        let alert = {
            let mut inner = self.lock();
            inner.events.push_back(BufferedEvent {
                arrived: Instant::now(),
                event: event.clone(),
            });
            let key = counter_key(&error_type, operation);
            Self::bump_counter(&mut inner, key, self.config.max_counter_keys);
            Self::cleanup(&mut inner, self.config.window);
            self.check_rate(&mut inner)
        };
        if let Some((rate, suppressed)) = alert {
            metrics::record_rate_alert(RATE_ALERT_KEY);
            warn!(
                rate_per_minute = rate,
                threshold = self.config.rate_threshold_per_min,
                suppressed_since_last = suppressed,
                "error rate exceeded threshold"
            );
        }

        if is_critical {
            if let Some(notifier) = &self.notifier {
                if let Err(e) = notifier
                    .notify(&event.error_type, &event.message, &event.context)
                    .await
                {
                    // Recorded, not swallowed silently; delivery retry is the
                    // notifier's responsibility
                    error!(error_type = %event.error_type, notify_error = %e,
                        "failed to deliver critical-error notification");
                }
            }
        }
    }

    /// Whether the windowed error rate currently exceeds the threshold.
    pub fn rate_exceeds(&self) -> bool {
        let mut inner = self.lock();
        Self::cleanup(&mut inner, self.config.window);
        self.rate_per_minute(&inner) > self.config.rate_threshold_per_min
    }

    /// Drop events older than the window. Runs on every `report`; exposed
    /// for schedulers that want an explicit sweep.
    pub fn cleanup_old_events(&self) {
        let mut inner = self.lock();
        Self::cleanup(&mut inner, self.config.window);
    }

    /// Read-only snapshot of counters and the current window.
    pub fn summary(&self) -> ErrorSummary {
        let mut inner = self.lock();
        Self::cleanup(&mut inner, self.config.window);

        let mut top: Vec<(String, u64)> = inner
            .counters
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(self.config.top_n);

        ErrorSummary {
            total_types: inner.counters.len(),
            counts_by_key: inner.counters.clone(),
            recent_count: inner.events.len(),
            rate_per_minute: self.rate_per_minute(&inner),
            top,
        }
    }

    fn rate_per_minute(&self, inner: &ReporterInner) -> f64 {
        let window_minutes = self.config.window.as_secs_f64() / 60.0;
        if window_minutes <= 0.0 {
            return 0.0;
        }
        inner.events.len() as f64 / window_minutes
    }

    /// Returns `Some((rate, suppressed))` when an alert should be emitted.
    fn check_rate(&self, inner: &mut ReporterInner) -> Option<(f64, u64)> {
        let rate = self.rate_per_minute(inner);
        if rate > self.config.rate_threshold_per_min && inner.throttle.should_alert(RATE_ALERT_KEY)
        {
            let suppressed = inner.throttle.take_suppressed(RATE_ALERT_KEY);
            Some((rate, suppressed))
        } else {
            None
        }
    }

    fn bump_counter(inner: &mut ReporterInner, key: String, max_keys: usize) {
        if !inner.counters.contains_key(&key) && inner.counters.len() >= max_keys {
            // Bound the long-lived map: evict the lowest-count key
            if let Some(evict) = inner
                .counters
                .iter()
                .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
                .map(|(k, _)| k.clone())
            {
                debug!(evicted_key = %evict, "counter map at capacity, evicting");
                inner.counters.remove(&evict);
            }
        }
        *inner.counters.entry(key).or_insert(0) += 1;
    }

    fn cleanup(inner: &mut ReporterInner, window: Duration) {
        let now = Instant::now();
        inner.events.retain(|entry| {
            match now.checked_duration_since(entry.arrived) {
                Some(age) => age <= window,
                None => {
                    // Arrival time in the future relative to now: clock
                    // anomaly. Skip the entry, keep sweeping the rest.
                    debug!(error_type = %entry.event.error_type,
                        "dropping event with unreadable arrival time during cleanup");
                    false
                }
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReporterInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Stable key for the per-error counters: variant-level error name, no
/// instance payloads.
fn error_type_of<E: ErrorClass + fmt::Debug>(err: &E) -> String {
    match err.error_code() {
        Some(code) => code.as_str().to_string(),
        None => {
            // Uncataloged: fall back to the debug variant name
            let debug = format!("{err:?}");
            debug
                .split(|c: char| c == '(' || c == ' ' || c == '{')
                .next()
                .unwrap_or("Unknown")
                .to_string()
        }
    }
}

fn counter_key(error_type: &str, operation: Option<&str>) -> String {
    match operation {
        Some(op) => format!("{error_type}:{op}"),
        None => error_type.to_string(),
    }
}
