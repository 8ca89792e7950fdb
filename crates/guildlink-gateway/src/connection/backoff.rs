//! Reconnect backoff
//!
//! Exponential growth from a base delay, capped, with symmetric jitter so a
//! fleet of clients dropped together does not reconnect in lockstep.

use guildlink_common::GatewayConfig;
use rand::Rng;
use std::time::Duration;

const MULTIPLIER: f64 = 2.0;

/// Reconnect delay calculator
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration, jitter: f64) -> Self {
        let base_ms = (base.as_millis() as u64).max(1);
        Self {
            base_ms,
            max_ms: (max.as_millis() as u64).max(base_ms),
            jitter: jitter.clamp(0.0, 1.0),
            attempt: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
            config.backoff_jitter,
        )
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let exp = MULTIPLIER.powi(self.attempt.min(32) as i32);
        let capped = (self.base_ms as f64 * exp).min(self.max_ms as f64);

        let spread = capped * self.jitter;
        let offset = if spread > 0.0 {
            rand::thread_rng().gen_range(-spread..=spread)
        } else {
            0.0
        };
        // Only the cap is enforced so the first retry spreads around the base
        let delay_ms = (capped + offset).clamp(1.0, self.max_ms as f64);

        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(delay_ms as u64)
    }

    /// Call after a successful handshake
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    #[inline]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Random pause before answering an invalid session
#[must_use]
pub fn invalid_session_delay(config: &GatewayConfig) -> Duration {
    let min = config.invalid_session_delay_min_ms;
    let max = config.invalid_session_delay_max_ms.max(min);
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> Backoff {
        Backoff::new(Duration::from_millis(100), Duration::from_millis(1000), 0.0)
    }

    #[test]
    fn test_delay_doubles() {
        let mut backoff = no_jitter();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_delay_is_capped() {
        let mut backoff = no_jitter();
        for _ in 0..50 {
            assert!(backoff.next_delay() <= Duration::from_millis(1000));
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_reset() {
        let mut backoff = no_jitter();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(60), 0.3);
        for _ in 0..3 {
            backoff.next_delay();
        }
        // attempt 3: 800ms +/- 30%
        for _ in 0..100 {
            let mut probe = backoff.clone();
            let delay = probe.next_delay();
            assert!(delay >= Duration::from_millis(560));
            assert!(delay <= Duration::from_millis(1040));
        }
    }

    #[test]
    fn test_first_retry_spreads_around_base() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 0.5);
        let delays: Vec<_> = (0..200).map(|_| backoff.clone().next_delay()).collect();

        assert!(delays
            .iter()
            .all(|d| *d >= Duration::from_millis(50) && *d <= Duration::from_millis(150)));
        assert!(delays.iter().any(|d| *d < Duration::from_millis(100)));
        assert!(delays.iter().any(|d| *d > Duration::from_millis(100)));
        let on_base = delays
            .iter()
            .filter(|d| **d == Duration::from_millis(100))
            .count();
        assert!(on_base < 20, "{on_base} of 200 delays landed on the base");
    }

    #[test]
    fn test_full_jitter_never_reaches_zero() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 1.0);
        for _ in 0..100 {
            assert!(backoff.clone().next_delay() >= Duration::from_millis(1));
        }
    }

    #[test]
    fn test_invalid_session_delay_range() {
        let mut config = GatewayConfig::new("wss://gateway.test");
        config.invalid_session_delay_min_ms = 1000;
        config.invalid_session_delay_max_ms = 5000;
        for _ in 0..100 {
            let delay = invalid_session_delay(&config);
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(5));
        }

        config.invalid_session_delay_max_ms = 10;
        assert_eq!(invalid_session_delay(&config), Duration::from_millis(1000));
    }
}
