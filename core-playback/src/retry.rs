//! # Retry Policy
//!
//! Consecutive-failure accounting for auto-advancing playback.
//!
//! ## Behavior
//!
//! - Success resets the counter and the delay.
//! - A failure below the threshold yields [`RetryDecision::RetryAfter`] with
//!   the current delay, then doubles the delay up to the cap.
//! - The failure that reaches the threshold yields [`RetryDecision::GiveUp`]
//!   and resets both values, so the next failure starts a fresh cycle.

use std::time::Duration;

use crate::config::PlaybackConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Skip to the next track after this delay.
    RetryAfter(Duration),
    /// Stop advancing and tell the listener.
    GiveUp { failures: u32 },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    consecutive_failures: u32,
    delay: Duration,
    max_failures: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_failures: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            delay: initial_delay,
            max_failures: max_failures.max(1),
            initial_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(
            config.max_consecutive_failures,
            config.initial_retry_delay(),
            config.max_retry_delay(),
        )
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    pub fn record_success(&mut self) {
        self.reset();
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_failures {
            let failures = self.consecutive_failures;
            self.reset();
            return RetryDecision::GiveUp { failures };
        }
        let delay = self.delay;
        self.delay = (self.delay * 2).min(self.max_delay);
        RetryDecision::RetryAfter(delay)
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.delay = self.initial_delay;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PlaybackConfig::default())
    }
}

/// Counts reloads of a track that keeps ending long before its duration.
#[derive(Debug, Clone)]
pub struct AbnormalStopGuard {
    attempts: u32,
    limit: u32,
}

impl AbnormalStopGuard {
    /// Fraction of the duration below which a finish counts as abnormal.
    pub const MIN_PLAYED_FRACTION: f64 = 0.5;
    /// Positions past this point always count as a genuine finish.
    pub const ABNORMAL_WINDOW: Duration = Duration::from_secs(30);

    pub fn new(limit: u32) -> Self {
        Self { attempts: 0, limit }
    }

    /// Whether a finish at `played` of `duration` looks like a premature stop.
    pub fn is_abnormal(played: Duration, duration: Duration) -> bool {
        !duration.is_zero()
            && played < Self::ABNORMAL_WINDOW
            && played.as_secs_f64() < duration.as_secs_f64() * Self::MIN_PLAYED_FRACTION
    }

    /// Record one reload attempt. Returns `false` once the limit is spent.
    pub fn try_reload(&mut self) -> bool {
        if self.attempts >= self.limit {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }

    #[test]
    fn backoff_doubles_until_threshold() {
        let mut policy = policy();
        assert_eq!(
            policy.record_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            policy.record_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(policy.record_failure(), RetryDecision::GiveUp { failures: 3 });
        assert_eq!(policy.consecutive_failures(), 0);
        assert_eq!(policy.current_delay(), Duration::from_secs(1));
    }

    #[test]
    fn delay_is_capped() {
        let mut policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(10));
        let mut delays = Vec::new();
        for _ in 0..9 {
            match policy.record_failure() {
                RetryDecision::RetryAfter(d) => delays.push(d.as_secs()),
                RetryDecision::GiveUp { .. } => unreachable!(),
            }
            assert!(policy.current_delay() <= Duration::from_secs(10));
        }
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10, 10, 10, 10]);
    }

    #[test]
    fn success_resets_state() {
        let mut policy = policy();
        policy.record_failure();
        policy.record_failure();
        policy.record_success();
        assert_eq!(policy.consecutive_failures(), 0);
        assert_eq!(policy.current_delay(), Duration::from_secs(1));
        assert!(matches!(policy.record_failure(), RetryDecision::RetryAfter(_)));
    }

    #[test]
    fn abnormal_stop_detection() {
        let duration = Duration::from_secs(200);
        assert!(AbnormalStopGuard::is_abnormal(Duration::from_secs(5), duration));
        assert!(!AbnormalStopGuard::is_abnormal(Duration::from_secs(31), duration));
        assert!(!AbnormalStopGuard::is_abnormal(
            Duration::from_secs(15),
            Duration::from_secs(20)
        ));
        assert!(!AbnormalStopGuard::is_abnormal(Duration::from_secs(1), Duration::ZERO));
    }

    #[test]
    fn abnormal_stop_limit() {
        let mut guard = AbnormalStopGuard::new(3);
        assert!(guard.try_reload());
        assert!(guard.try_reload());
        assert!(guard.try_reload());
        assert!(!guard.try_reload());
        guard.reset();
        assert!(guard.try_reload());
    }
}
