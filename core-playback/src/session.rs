//! Session guard: a monotonic token invalidating stale asynchronous results.
//!
//! Every load request calls [`SessionGuard::begin`] and captures the token.
//! Completion handlers check [`SessionGuard::is_current`] before touching any
//! state, so only the most recent request's result is ever applied.

use std::fmt;

/// Token captured when an asynchronous request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct SessionGuard {
    counter: u64,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, invalidating every earlier token.
    pub fn begin(&mut self) -> SessionToken {
        self.counter += 1;
        SessionToken(self.counter)
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        token.0 == self.counter
    }

    pub fn current(&self) -> SessionToken {
        SessionToken(self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_token_is_current() {
        let mut guard = SessionGuard::new();
        let first = guard.begin();
        let second = guard.begin();
        let third = guard.begin();

        assert!(!guard.is_current(first));
        assert!(!guard.is_current(second));
        assert!(guard.is_current(third));
        assert!(first < third);
        assert_eq!(guard.current(), third);
    }

    #[test]
    fn fresh_guard_accepts_nothing_issued_later() {
        let mut guard = SessionGuard::new();
        let before = guard.current();
        guard.begin();
        assert!(!guard.is_current(before));
    }
}
