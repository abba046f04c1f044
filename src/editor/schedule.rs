//! Timing rules for debounced local saves and throttled remote saves.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosavePolicy {
    /// Quiet period before a local write.
    pub local_delay: Duration,
    /// Minimum spacing between remote attempt starts.
    pub remote_interval: Duration,
    /// Longest an unsynced edit waits for a remote attempt.
    pub remote_cap: Duration,
    /// Unit of the exponential retry backoff.
    pub retry_base: Duration,
    /// Consecutive remote failures before automatic retries stop.
    pub max_failures: u32,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self {
            local_delay: Duration::from_secs(3),
            remote_interval: Duration::from_secs(10),
            remote_cap: Duration::from_secs(15),
            retry_base: Duration::from_secs(1),
            max_failures: 3,
        }
    }
}

impl AutosavePolicy {
    /// When the remote timer armed by an edit at `now` should fire.
    ///
    /// The edit waits one interval, but never past `unsynced_since + cap`,
    /// and never earlier than one interval after the previous attempt started.
    pub fn remote_fire_at(
        &self,
        now: Instant,
        unsynced_since: Instant,
        last_attempt: Option<Instant>,
    ) -> Instant {
        let debounced = (now + self.remote_interval).min(unsynced_since + self.remote_cap);
        let spaced = match last_attempt {
            Some(at) => debounced.max(at + self.remote_interval),
            None => debounced,
        };
        spaced.max(now)
    }

    /// Backoff after `failures` consecutive failures: `retry_base * 2^failures`.
    pub fn retry_delay(&self, failures: u32) -> Duration {
        self.retry_base
            .saturating_mul(2u32.saturating_pow(failures.min(16)))
    }

    /// Next retry: one interval after the failed attempt started, plus the
    /// backoff. `None` once the failure budget is spent.
    pub fn retry_at(&self, now: Instant, failures: u32, last_attempt: Instant) -> Option<Instant> {
        if failures >= self.max_failures {
            return None;
        }
        Some((last_attempt + self.remote_interval + self.retry_delay(failures)).max(now))
    }
}
