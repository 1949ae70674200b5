use std::time::Duration;

/// Bounded exponential backoff for transient store errors.
///
/// The policy is pure: it answers "should attempt N retry, and after how
/// long"; the caller owns the sleep so async and sync call sites share it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next retry, given the number of retries already
    /// made, or `None` when the attempts are exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        Some(exp.min(self.max_delay))
    }
}
