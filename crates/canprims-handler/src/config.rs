use std::time::Duration;

/// Default readiness batch size per wait.
pub const DEFAULT_MAX_EVENTS: usize = 32;

/// How `update_write` retries a frame the bus did not accept in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts per frame. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Retry forever without sleeping.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Whether another attempt is allowed after `attempts` have failed.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(8),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(100),
        }
    }
}

/// Controls bus handler behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Maximum readiness events collected per `update_read`.
    pub max_events: usize,
    /// Upper bound for a single readiness wait. `None` waits indefinitely.
    pub read_timeout: Option<Duration>,
    /// Write retry behavior.
    pub retry: RetryPolicy,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            read_timeout: None,
            retry: RetryPolicy::default(),
        }
    }
}
