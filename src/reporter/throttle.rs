//! Keyed alert-cooldown throttle.
//!
//! Deduplicates alerts so a sustained error burst produces one alert per
//! cooldown period per alert key, while still counting what was suppressed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct KeyState {
    last_alert: Instant,
    suppressed: u64,
}

/// Per-key rate limiter for alert emission.
#[derive(Debug)]
pub struct AlertThrottle {
    cooldown: Duration,
    keys: HashMap<String, KeyState>,
}

impl AlertThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            keys: HashMap::new(),
        }
    }

    /// Checks if an alert for `key` should be emitted now.
    /// Returns true if the cooldown has passed since the last alert for the
    /// key (or the key has never alerted). If false, increments the key's
    /// suppressed counter.
    pub fn should_alert(&mut self, key: &str) -> bool {
        let now = Instant::now();
        match self.keys.get_mut(key) {
            Some(state) => {
                if now.duration_since(state.last_alert) >= self.cooldown {
                    state.last_alert = now;
                    true
                } else {
                    state.suppressed += 1;
                    false
                }
            }
            None => {
                self.keys.insert(
                    key.to_string(),
                    KeyState {
                        last_alert: now,
                        suppressed: 0,
                    },
                );
                true
            }
        }
    }

    /// Returns the suppressed count for `key` since its last emitted alert,
    /// resetting the counter.
    pub fn take_suppressed(&mut self, key: &str) -> u64 {
        match self.keys.get_mut(key) {
            Some(state) => std::mem::take(&mut state.suppressed),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_alert_passes() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        assert!(throttle.should_alert("error_rate"));
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        assert!(throttle.should_alert("error_rate"));
        assert!(!throttle.should_alert("error_rate"));
        assert!(!throttle.should_alert("error_rate"));
        assert_eq!(throttle.take_suppressed("error_rate"), 2);
        assert_eq!(throttle.take_suppressed("error_rate"), 0);
    }

    #[test]
    fn keys_are_independent() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        assert!(throttle.should_alert("a"));
        assert!(throttle.should_alert("b"));
        assert!(!throttle.should_alert("a"));
    }

    #[test]
    fn zero_cooldown_never_suppresses() {
        let mut throttle = AlertThrottle::new(Duration::ZERO);
        assert!(throttle.should_alert("error_rate"));
        assert!(throttle.should_alert("error_rate"));
    }
}
