//! Observable player state.
//!
//! The orchestrator republishes a [`PlayerState`] through a
//! `tokio::sync::watch` channel after every command or internal message that
//! changed it. UI layers read it with `borrow()` and wait for changes with
//! `changed()`; they never mutate it.

use bridge_traits::{Quality, Track};
use serde::Serialize;
use std::time::Duration;

use crate::model::{PlayMode, PlaySource};
use crate::transition::TransitionPhase;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub is_loading: bool,
    /// Displayed position. Shows the seek target while a seek is in flight.
    pub current_time: Duration,
    pub duration: Duration,
    pub is_seeking: bool,
    /// User queue followed by the rest of the active list.
    pub upcoming: Vec<Track>,
    /// The leading `user_queue_len` entries of `upcoming` are user-queued.
    pub user_queue_len: usize,
    pub context_len: usize,
    pub position: Option<usize>,
    pub mode: PlayMode,
    pub play_source: PlaySource,
    pub quality: Quality,
    /// Most recent first.
    pub history: Vec<Track>,
    pub can_go_back: bool,
    #[serde(skip)]
    pub transition: TransitionPhase,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            is_loading: false,
            current_time: Duration::ZERO,
            duration: Duration::ZERO,
            is_seeking: false,
            upcoming: Vec::new(),
            user_queue_len: 0,
            context_len: 0,
            position: None,
            mode: PlayMode::default(),
            play_source: PlaySource::default(),
            quality: Quality::default(),
            history: Vec::new(),
            can_go_back: false,
            transition: TransitionPhase::Idle,
        }
    }
}

impl PlayerState {
    pub fn is_in_user_queue(&self, track: &Track) -> bool {
        self.upcoming[..self.user_queue_len.min(self.upcoming.len())].contains(track)
    }

    pub fn is_upcoming_index_in_user_queue(&self, index: usize) -> bool {
        index < self.user_queue_len
    }

    /// Fraction of the track played, when the duration is known.
    pub fn progress(&self) -> Option<f64> {
        if self.duration.is_zero() {
            return None;
        }
        Some((self.current_time.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::TrackKey;

    #[test]
    fn user_queue_queries_use_prefix() {
        let a = Track::new(TrackKey::primary("a"), "a");
        let b = Track::new(TrackKey::primary("b"), "b");
        let state = PlayerState {
            upcoming: vec![a.clone(), b.clone()],
            user_queue_len: 1,
            ..Default::default()
        };
        assert!(state.is_in_user_queue(&a));
        assert!(!state.is_in_user_queue(&b));
        assert!(state.is_upcoming_index_in_user_queue(0));
        assert!(!state.is_upcoming_index_in_user_queue(1));
    }

    #[test]
    fn progress_requires_duration() {
        let mut state = PlayerState::default();
        assert_eq!(state.progress(), None);
        state.duration = Duration::from_secs(200);
        state.current_time = Duration::from_secs(50);
        assert_eq!(state.progress(), Some(0.25));
    }
}
