//! Play history and the "previous" back stack.

use bridge_traits::Track;
use std::collections::VecDeque;

/// Recently played tracks, most recent first, without duplicates.
#[derive(Debug, Clone)]
pub struct PlayHistory {
    entries: VecDeque<Track>,
    limit: usize,
}

impl PlayHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn record(&mut self, track: &Track) {
        self.entries.retain(|t| t != track);
        self.entries.push_front(track.clone());
        self.entries.truncate(self.limit);
    }

    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.entries.clear();
        for track in tracks.iter().rev() {
            self.record(track);
        }
    }

    pub fn to_vec(&self) -> Vec<Track> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tracks left behind by forward navigation, popped by "previous".
///
/// When full, the oldest entry is dropped.
#[derive(Debug, Clone)]
pub struct BackStack {
    entries: VecDeque<Track>,
    limit: usize,
}

impl BackStack {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, track: Track) {
        if self.entries.back() == Some(&track) {
            return;
        }
        self.entries.push_back(track);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<Track> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first, as persisted.
    pub fn to_vec(&self) -> Vec<Track> {
        self.entries.iter().cloned().collect()
    }

    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.entries.clear();
        for track in tracks {
            self.push(track);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
