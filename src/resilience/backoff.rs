//! Exponential backoff policy.
//!
//! `delay` is a pure function: the jitter draw is passed in by the caller
//! rather than read from a global RNG, so tests can fix the draw and assert
//! exact delays. Production callers supply `rand::rng().random_range(0.5..=1.0)`.

use crate::error::ConfigError;
use std::time::Duration;

/// Configuration for the retry/backoff executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Retries after the initial attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any computed delay
    pub max_delay: Duration,
    /// Exponential growth factor per attempt
    pub multiplier: f64,
    /// Scale each delay by a uniform draw from [0.5, 1.0]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Build a validated config. Invariants: `base_delay > 0`,
    /// `max_delay >= base_delay`, `multiplier > 1.0`.
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_retries,
            base_delay,
            max_delay,
            multiplier,
            jitter,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the config invariants without consuming the value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay.is_zero() {
            return Err(ConfigError::ZeroBaseDelay);
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::MaxBelowBase {
                base_delay: self.base_delay,
                max_delay: self.max_delay,
            });
        }
        if self.multiplier <= 1.0 {
            return Err(ConfigError::MultiplierTooSmall(self.multiplier));
        }
        Ok(())
    }
}

/// Deterministic delay for the given attempt: `min(base * multiplier^attempt, max)`.
///
/// Attempt 0 yields `base_delay`.
pub fn raw_delay(attempt: u32, config: &BackoffConfig) -> Duration {
    let base = config.base_delay.as_secs_f64() * config.multiplier.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    // powi can overflow to infinity for large attempts; the min above
    // collapses that to max_delay, and negatives are impossible here.
    Duration::from_secs_f64(capped.max(0.0))
}

/// Delay with jitter applied when the config enables it.
///
/// The draw is clamped into `[0.5, 1.0]`, so the result is never less than
/// half the deterministic delay and never exceeds it. Total over all inputs.
pub fn delay(attempt: u32, config: &BackoffConfig, draw: f64) -> Duration {
    let base = raw_delay(attempt, config);
    if !config.jitter {
        return base;
    }
    let factor = draw.clamp(0.5, 1.0);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_no_jitter() -> BackoffConfig {
        BackoffConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn attempt_zero_yields_base_delay() {
        let config = config_no_jitter();
        assert_eq!(raw_delay(0, &config), Duration::from_millis(100));
    }

    #[test]
    fn delay_is_monotonic_until_cap() {
        let config = config_no_jitter();
        let mut prev = Duration::ZERO;
        for attempt in 0..20 {
            let d = delay(attempt, &config, 1.0);
            assert!(d >= prev, "delay({attempt}) regressed: {d:?} < {prev:?}");
            prev = d;
        }
    }

    #[test]
    fn delay_is_bounded_by_max() {
        let config = config_no_jitter();
        for attempt in 0..64 {
            let d = delay(attempt, &config, 1.0);
            assert!(d <= config.max_delay);
        }
        // Deep attempts saturate at the cap instead of overflowing
        assert_eq!(raw_delay(1000, &config), config.max_delay);
    }

    #[test]
    fn exact_delays_for_known_config() {
        let config = config_no_jitter();
        assert_eq!(delay(0, &config, 1.0), Duration::from_millis(100));
        assert_eq!(delay(1, &config, 1.0), Duration::from_millis(200));
        assert_eq!(delay(2, &config, 1.0), Duration::from_millis(400));
    }

    #[test]
    fn jitter_scales_within_half_to_full() {
        let config = BackoffConfig {
            jitter: true,
            ..config_no_jitter()
        };
        let base = raw_delay(3, &config);
        assert_eq!(delay(3, &config, 0.5), base / 2);
        assert_eq!(delay(3, &config, 1.0), base);
        // Out-of-range draws are clamped, keeping the function total
        assert_eq!(delay(3, &config, -7.0), base / 2);
        assert_eq!(delay(3, &config, 42.0), base);
    }

    #[test]
    fn jitter_disabled_ignores_draw() {
        let config = config_no_jitter();
        assert_eq!(delay(2, &config, 0.5), delay(2, &config, 1.0));
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        assert!(matches!(
            BackoffConfig::new(3, Duration::ZERO, Duration::from_secs(1), 2.0, false),
            Err(ConfigError::ZeroBaseDelay)
        ));
        assert!(matches!(
            BackoffConfig::new(
                3,
                Duration::from_secs(2),
                Duration::from_secs(1),
                2.0,
                false
            ),
            Err(ConfigError::MaxBelowBase { .. })
        ));
        assert!(matches!(
            BackoffConfig::new(
                3,
                Duration::from_secs(1),
                Duration::from_secs(2),
                1.0,
                false
            ),
            Err(ConfigError::MultiplierTooSmall(_))
        ));
        assert!(BackoffConfig::default().validate().is_ok());
    }
}
