//! Seek coordinator.
//!
//! Tracks the optimistic seek target shown to the listener while a debounced
//! seek is on its way to the engine. Each request bumps a generation; the
//! debounce timer fires with the generation it was scheduled under, and only
//! the latest generation reaches the engine.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct SeekCoordinator {
    target: Option<Duration>,
    generation: u64,
    requested_at: Option<Instant>,
    tolerance: Duration,
    confirm_timeout: Duration,
}

impl SeekCoordinator {
    pub fn new(tolerance: Duration, confirm_timeout: Duration) -> Self {
        Self {
            target: None,
            generation: 0,
            requested_at: None,
            tolerance,
            confirm_timeout,
        }
    }

    /// Record a new target and return its generation.
    pub fn request(&mut self, target: Duration, now: Instant) -> u64 {
        self.generation += 1;
        self.target = Some(target);
        self.requested_at = Some(now);
        self.generation
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn target(&self) -> Option<Duration> {
        self.target
    }

    pub fn is_seeking(&self) -> bool {
        self.target.is_some()
    }

    /// Feed an engine-reported position.
    ///
    /// Returns `true` while the displayed position should keep showing the
    /// target. The target clears once the engine is within tolerance, or when
    /// confirmation takes longer than the timeout.
    pub fn observe(&mut self, engine_time: Duration, now: Instant) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let distance = if engine_time > target {
            engine_time - target
        } else {
            target - engine_time
        };
        let timed_out = self
            .requested_at
            .is_some_and(|at| now.saturating_duration_since(at) >= self.confirm_timeout);
        if distance <= self.tolerance || timed_out {
            self.target = None;
            self.requested_at = None;
            return false;
        }
        true
    }

    /// Forget the current target and invalidate scheduled seeks.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.target = None;
        self.requested_at = None;
    }
}
