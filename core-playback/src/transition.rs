//! # Transition Coordinator
//!
//! State machine for the two-phase prepare/commit protocol used by gapless
//! next-track preloading and by quality switches.
//!
//! ```text
//!            begin()            mark_prepared()         begin_commit()
//!   Idle ─────────────> Preparing ─────────────> Prepared ─────────────> Committing
//!    ^                      │                        │                       │
//!    └──────── reset() ─────┴────────────────────────┘     finish_commit()   │
//!    └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pending track and the "has pending" flag live in one enum, so they can
//! only ever be set and cleared together. Each `begin` and `reset` bumps the
//! epoch; preparation results carry the epoch they were issued under and are
//! ignored once it has moved on.

use bridge_traits::{Quality, Track};
use std::time::Duration;

use crate::session::{SessionGuard, SessionToken};

/// What a pending transition will do when committed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPurpose {
    /// Gapless move to the successor at the end of the current track.
    NextTrack,
    /// Swap the current track to another stream quality in place.
    QualitySwitch { quality: Quality, resume_at: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransition {
    pub track: Track,
    pub purpose: TransitionPurpose,
    pub epoch: SessionToken,
    /// Set once the engine accepted the secondary source.
    pub handed_off: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    Preparing,
    Prepared,
    Committing,
}

#[derive(Debug)]
enum State {
    Idle,
    Preparing(PendingTransition),
    Prepared(PendingTransition),
    Committing,
}

#[derive(Debug)]
pub struct TransitionCoordinator {
    state: State,
    epochs: SessionGuard,
}

impl Default for TransitionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionCoordinator {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            epochs: SessionGuard::new(),
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        match self.state {
            State::Idle => TransitionPhase::Idle,
            State::Preparing(_) => TransitionPhase::Preparing,
            State::Prepared(_) => TransitionPhase::Prepared,
            State::Committing => TransitionPhase::Committing,
        }
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        match &self.state {
            State::Preparing(p) | State::Prepared(p) => Some(p),
            State::Idle | State::Committing => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Start preparing `track`, replacing any earlier pending transition.
    pub fn begin(&mut self, track: Track, purpose: TransitionPurpose) -> SessionToken {
        let epoch = self.epochs.begin();
        self.state = State::Preparing(PendingTransition {
            track,
            purpose,
            epoch,
            handed_off: false,
        });
        epoch
    }

    /// Whether `epoch` still names the pending transition.
    pub fn is_current(&self, epoch: SessionToken) -> bool {
        self.pending().is_some_and(|p| p.epoch == epoch)
    }

    /// Whether `epoch` names a transition still waiting for its buffer.
    pub fn is_preparing(&self, epoch: SessionToken) -> bool {
        matches!(&self.state, State::Preparing(p) if p.epoch == epoch)
    }

    /// Record that the engine accepted the secondary source.
    pub fn mark_handed_off(&mut self, epoch: SessionToken) -> bool {
        match &mut self.state {
            State::Preparing(p) if p.epoch == epoch => {
                p.handed_off = true;
                true
            }
            _ => false,
        }
    }

    /// Move to `Prepared` once the engine reports the secondary buffer ready.
    ///
    /// Ignored unless a handed-off preparation is in flight.
    pub fn mark_prepared(&mut self) -> Option<&PendingTransition> {
        let ready = matches!(&self.state, State::Preparing(p) if p.handed_off);
        if ready {
            if let State::Preparing(p) = std::mem::replace(&mut self.state, State::Idle) {
                self.state = State::Prepared(p);
            }
        }
        match &self.state {
            State::Prepared(p) if ready => Some(p),
            _ => None,
        }
    }

    /// Take the prepared transition and enter `Committing`.
    pub fn begin_commit(&mut self) -> Option<PendingTransition> {
        if !matches!(self.state, State::Prepared(_)) {
            return None;
        }
        match std::mem::replace(&mut self.state, State::Committing) {
            State::Prepared(p) => Some(p),
            _ => None,
        }
    }

    pub fn finish_commit(&mut self) {
        if matches!(self.state, State::Committing) {
            self.state = State::Idle;
        }
    }

    /// Abandon whatever is pending. Returns `true` if something was.
    pub fn reset(&mut self) -> bool {
        let had_pending = self.has_pending();
        self.epochs.begin();
        self.state = State::Idle;
        had_pending
    }
}
