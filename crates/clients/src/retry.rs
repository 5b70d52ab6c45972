//! Exponential backoff with full jitter.

use std::time::Duration;

use rand::Rng;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay before the first retry.
    pub initial_delay: Duration,
    /// Factor by which the base delay grows after each failure.
    pub multiplier: f64,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
    /// Total time budget across all attempts.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Calculate the next base delay from the current one.
    ///
    /// The result is clamped to [`RetryPolicy::max_delay`].
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }

    /// Apply full jitter: a uniform draw from `[0, delay]`.
    pub fn jittered(&self, delay: Duration) -> Duration {
        let max_ms = delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(Duration::from_millis(500)), Duration::from_secs(1));
        assert_eq!(policy.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(4),
            ..Default::default()
        };
        assert_eq!(policy.next_delay(Duration::from_secs(3)), Duration::from_secs(4));
        assert_eq!(policy.next_delay(Duration::from_secs(4)), Duration::from_secs(4));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        let expected_ms = [500, 1_000, 2_000, 4_000, 8_000, 10_000, 10_000];

        for &ms in &expected_ms {
            assert_eq!(delay.as_millis() as u64, ms);
            delay = policy.next_delay(delay);
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        let base = Duration::from_millis(800);
        for _ in 0..100 {
            let jittered = policy.jittered(base);
            assert!(jittered <= base);
        }
    }

    #[test]
    fn zero_delay_yields_zero_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.jittered(Duration::ZERO), Duration::ZERO);
    }
}
