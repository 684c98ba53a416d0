use std::{default::Default, time::Duration};

/// Retry policy used by an explicit page server reconnect
#[derive(Clone, Debug)]
pub struct ReconnectConfig {
    /// Number of connect attempts before giving up. Zero is treated as one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for the delay between attempts, before jitter
    pub max_delay: Duration,
}

impl ReconnectConfig {
    /// Delay to wait after failed attempt number `attempt` (starting at 1).
    ///
    /// Doubles per attempt up to `max_delay`, plus up to 50% random jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        base + base.mul_f64(fastrand::f64() * 0.5)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}
