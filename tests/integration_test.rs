//! End-to-end scenarios composing the retry executor, circuit breaker, and
//! error reporter the way a trading service wires them in production.

use mockall::mock;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tradeguard::reporter::{Notifier, NotifyError};
use tradeguard::{
    BackoffConfig, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, ErrorReporter,
    ReporterConfig, RetryError, RetryExecutor, TradingError,
};

mock! {
    pub AlertChannel {}

    #[async_trait::async_trait]
    impl Notifier for AlertChannel {
        async fn notify(
            &self,
            error_type: &str,
            message: &str,
            context: &Map<String, Value>,
        ) -> Result<(), NotifyError>;
    }
}

fn backoff_100ms(max_retries: u32) -> BackoffConfig {
    BackoffConfig {
        max_retries,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(10),
        multiplier: 2.0,
        jitter: false,
    }
}

fn provider_down() -> TradingError {
    TradingError::ProviderUnavailable {
        provider: "coinbase".into(),
        reason: "connection refused".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn retry_scenario_fails_twice_then_succeeds() {
    let executor = RetryExecutor::new("get_candles", backoff_100ms(3));
    let calls = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let result = executor
        .execute(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(provider_down())
                } else {
                    Ok("candles")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "candles");
    assert_eq!(calls.load(Ordering::SeqCst), 3, "exactly 3 invocations");
    // Delays between attempts were 100ms then 200ms
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test]
async fn breaker_scenario_open_reject_recover() {
    // Real time: the breaker's cooldown clock is monotonic wall time
    let breaker = CircuitBreaker::new(
        "data_provider",
        CircuitBreakerConfig::new(2, Duration::from_millis(50)).unwrap(),
    );

    // Two failures trip the breaker
    for _ in 0..2 {
        let result = breaker
            .call(|| async { Err::<(), _>(provider_down()) })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::Inner(_))));
    }

    // Immediate third call is rejected without running the operation
    let invoked = AtomicU32::new(0);
    let result = breaker
        .call(|| {
            invoked.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TradingError>(()) }
        })
        .await;
    assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    // After the cooldown the trial call succeeds and the circuit closes
    tokio::time::sleep(Duration::from_millis(100)).await;
    let result = breaker.call(|| async { Ok::<_, TradingError>(()) }).await;
    assert!(result.is_ok());
    assert_eq!(breaker.state(), tradeguard::CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn breaker_wrapping_retry_counts_one_failure_per_exhausted_loop() {
    let breaker = Arc::new(CircuitBreaker::new(
        "broker",
        CircuitBreakerConfig::new(2, Duration::from_secs(60)).unwrap(),
    ));
    let executor = RetryExecutor::new("place_order", backoff_100ms(2));
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let executor = executor.clone();
        let result = breaker
            .call(|| async move {
                executor
                    .execute(move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Err::<(), _>(provider_down()) }
                    })
                    .await
            })
            .await;
        assert!(matches!(
            result,
            Err(CircuitBreakerError::Inner(RetryError::Exhausted { .. }))
        ));
    }

    // Each exhausted retry loop (3 attempts) counts as one breaker failure
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert_eq!(breaker.state(), tradeguard::CircuitState::Open);
}

#[tokio::test]
async fn critical_failure_reaches_alert_channel_redacted() {
    let mut channel = MockAlertChannel::new();
    channel
        .expect_notify()
        .withf(|error_type, _message, context| {
            let serialized = serde_json::to_string(context).unwrap();
            error_type == "CONF_MISSING_ENV" && !serialized.contains("sk-live-123")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let reporter = ErrorReporter::with_notifier(ReporterConfig::default(), Arc::new(channel));

    let context = match json!({
        "api_key": "sk-live-123",
        "operation": "startup",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };

    reporter
        .report(
            &TradingError::MissingEnvVar("ALPACA_API_KEY".into()),
            context,
            true,
            Some("startup"),
        )
        .await;

    let summary = reporter.summary();
    assert_eq!(summary.recent_count, 1);
    assert_eq!(summary.counts_by_key["CONF_MISSING_ENV:startup"], 1);
}

#[tokio::test(start_paused = true)]
async fn terminal_retry_failures_feed_the_reporter() {
    let reporter = ErrorReporter::new(ReporterConfig::default());
    let executor = RetryExecutor::new("get_candles", backoff_100ms(1));

    let result: Result<(), _> = executor
        .execute(|| async { Err(provider_down()) })
        .await;

    match result {
        Err(RetryError::Exhausted { attempts, error }) => {
            assert_eq!(attempts, 2);
            reporter
                .report(&error, Map::new(), false, Some("get_candles"))
                .await;
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }

    let summary = reporter.summary();
    assert_eq!(summary.counts_by_key["DATA_PROVIDER_FAILURE:get_candles"], 1);
    assert!(summary.rate_per_minute > 0.0);
}

/// Shared buffer the fmt subscriber writes into, so tests can assert on
/// emitted events.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test(start_paused = true)]
async fn terminal_retry_outcomes_emit_observability_events() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let executor = RetryExecutor::new("get_candles", backoff_100ms(1));

    // Exhausted loop: one event per failed attempt plus a terminal event
    let result: Result<(), _> = executor.execute(|| async { Err(provider_down()) }).await;
    assert!(matches!(result, Err(RetryError::Exhausted { .. })));

    // Fatal error: terminal event without any backoff events
    let result: Result<(), _> = executor
        .execute(|| async {
            Err(TradingError::InsufficientFunds {
                required: 10.0,
                available: 1.0,
            })
        })
        .await;
    assert!(matches!(result, Err(RetryError::Fatal(_))));

    let output = logs.contents();
    assert!(output.contains("backing off"), "missing per-attempt event");
    assert!(
        output.contains("retries exhausted, giving up"),
        "missing exhausted terminal event"
    );
    assert!(
        output.contains("non-retryable failure, giving up"),
        "missing fatal terminal event"
    );
    assert!(output.contains("get_candles"));
}

#[tokio::test]
async fn non_retryable_business_error_propagates_untouched() {
    let executor = RetryExecutor::new("place_order", backoff_100ms(5));
    let calls = AtomicU32::new(0);

    let result: Result<(), _> = executor
        .execute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TradingError::InsufficientFunds {
                    required: 5000.0,
                    available: 120.0,
                })
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match result {
        Err(RetryError::Fatal(TradingError::InsufficientFunds { required, .. })) => {
            assert_eq!(required, 5000.0);
        }
        other => panic!("expected Fatal(InsufficientFunds), got {other:?}"),
    }
}
