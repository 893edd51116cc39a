//! # Queue Model
//!
//! The ordered track lists behind the player and the pointer into them.
//!
//! ## Layout
//!
//! - `context`: the primary list, in the order the listener picked it.
//! - `shuffled`: a permutation of `context`, populated only in shuffle mode.
//! - `position`: index into whichever of the two is active.
//! - `user_queue`: tracks explicitly queued ahead of the normal sequence.
//!
//! ## Invariants
//!
//! - `position` is `Some` and in range whenever the active list is non-empty,
//!   and `None` otherwise.
//! - A track identity appears at most once in `context` (and in `shuffled`).
//! - In shuffle mode `shuffled` holds exactly the identities of `context`;
//!   otherwise it is empty.
//!
//! The model has no concurrency of its own. The orchestrator owns it and
//! mutates it from a single task.

use bridge_traits::{Track, TrackKey};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

use crate::model::{PlayMode, PlaySource};
use crate::persistence::QueueSnapshot;

/// Playback queue with insert-with-dedupe semantics.
#[derive(Debug)]
pub struct QueueModel {
    context: Vec<Track>,
    shuffled: Vec<Track>,
    position: Option<usize>,
    user_queue: Vec<Track>,
    mode: PlayMode,
    source: PlaySource,
    rng: StdRng,
}

impl Default for QueueModel {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueModel {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Queue with a deterministic shuffle order.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            context: Vec::new(),
            shuffled: Vec::new(),
            position: None,
            user_queue: Vec::new(),
            mode: PlayMode::default(),
            source: PlaySource::default(),
            rng,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn context(&self) -> &[Track] {
        &self.context
    }

    pub fn shuffled_context(&self) -> &[Track] {
        &self.shuffled
    }

    pub fn user_queue(&self) -> &[Track] {
        &self.user_queue
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn play_source(&self) -> &PlaySource {
        &self.source
    }

    /// The list `position` points into.
    pub fn active(&self) -> &[Track] {
        if self.mode == PlayMode::Shuffle {
            &self.shuffled
        } else {
            &self.context
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active().is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.position.and_then(|p| self.active().get(p))
    }

    /// User queue followed by the rest of the active list.
    ///
    /// Context entries that are also in the user queue are listed only once,
    /// in their user-queue slot.
    pub fn upcoming(&self) -> Vec<Track> {
        let mut upcoming = self.user_queue.clone();
        let active = self.active();
        upcoming.extend(self.tail_indices().into_iter().map(|i| active[i].clone()));
        upcoming
    }

    pub fn is_in_user_queue(&self, track: &Track) -> bool {
        self.user_queue.contains(track)
    }

    pub fn is_upcoming_index_in_user_queue(&self, index: usize) -> bool {
        index < self.user_queue.len()
    }

    /// The track that [`advance`](Self::advance) would move to.
    ///
    /// User-queue head first, then the next active index. Wraps to the start
    /// except in FM mode, where the end of the list means there is no
    /// successor.
    pub fn successor(&self) -> Option<Track> {
        if let Some(head) = self.user_queue.first() {
            return Some(head.clone());
        }
        let index = self.next_index()?;
        self.active().get(index).cloned()
    }

    fn next_index(&self) -> Option<usize> {
        let len = self.active().len();
        if len == 0 {
            return None;
        }
        let next = self.position.map_or(0, |p| p + 1);
        if next < len {
            Some(next)
        } else if self.source.is_fm() {
            None
        } else {
            Some(0)
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Move to the successor and return it.
    ///
    /// A consumed user-queue head is spliced in right after the current track
    /// so that `current()` always names the playing track.
    pub fn advance(&mut self) -> Option<Track> {
        if !self.user_queue.is_empty() {
            let next = self.user_queue.remove(0);
            self.splice_after_current(std::slice::from_ref(&next));
            self.position = self.index_in_active(&next);
            return Some(next);
        }
        let index = self.next_index()?;
        self.position = Some(index);
        self.current().cloned()
    }

    /// Step back one entry, wrapping to the end.
    pub fn retreat(&mut self) -> Option<Track> {
        let len = self.active().len();
        if len == 0 {
            return None;
        }
        let index = match self.position {
            Some(0) | None => len - 1,
            Some(p) => p - 1,
        };
        self.position = Some(index);
        self.current().cloned()
    }

    /// Make `track` current, inserting it after the current entry if the
    /// active list does not contain it yet.
    pub fn focus(&mut self, track: &Track) {
        self.user_queue.retain(|t| t != track);
        if self.index_in_active(track).is_none() {
            self.splice_after_current(std::slice::from_ref(track));
        }
        self.position = self.index_in_active(track);
    }

    // ========================================================================
    // Context Edits
    // ========================================================================

    /// Replace the context.
    ///
    /// `start` becomes current; it is prepended when missing from `tracks`.
    /// Without `start` the first track becomes current.
    pub fn set_context(&mut self, tracks: Vec<Track>, start: Option<&Track>) {
        let mut context = dedupe(tracks);
        if let Some(start) = start {
            if !context.contains(start) {
                context.insert(0, start.clone());
            }
        }
        let current = start.cloned().or_else(|| context.first().cloned());
        self.context = context;
        if self.mode == PlayMode::Shuffle {
            self.shuffled = self.permutation_with_first(current.as_ref());
        } else {
            self.shuffled.clear();
        }
        self.position = current.and_then(|t| self.index_in_active(&t));
    }

    /// Insert `tracks` right after the current entry and make `now_playing`
    /// current.
    ///
    /// Pre-existing occurrences of the inserted identities are removed first,
    /// so the context never holds duplicates. `now_playing` is added to the
    /// inserted block when the caller did not include it.
    pub fn insert_after_current(&mut self, tracks: Vec<Track>, now_playing: &Track) {
        let mut block = dedupe(tracks);
        if !block.contains(now_playing) {
            block.insert(0, now_playing.clone());
        }
        if self.is_empty() {
            self.set_context(block, Some(now_playing));
            return;
        }
        self.user_queue.retain(|t| t != now_playing);
        self.splice_after_current(&block);
        self.position = self.index_in_active(now_playing);
    }

    /// Append tracks not yet in the context. Returns how many were added.
    pub fn append_unique(&mut self, tracks: Vec<Track>) -> usize {
        let known: HashSet<&TrackKey> = self.context.iter().map(|t| &t.key).collect();
        let fresh: Vec<Track> = dedupe(tracks)
            .into_iter()
            .filter(|t| !known.contains(&t.key))
            .collect();
        if fresh.is_empty() {
            return 0;
        }
        let added = fresh.len();
        if self.mode == PlayMode::Shuffle {
            let mut shuffled = fresh.clone();
            shuffled.shuffle(&mut self.rng);
            self.shuffled.extend(shuffled);
        }
        self.context.extend(fresh);
        if self.position.is_none() {
            self.position = Some(0);
        }
        added
    }

    /// Remove the entry at `offset` in [`upcoming`](Self::upcoming).
    pub fn remove_upcoming(&mut self, offset: usize) -> Option<Track> {
        if offset < self.user_queue.len() {
            return Some(self.user_queue.remove(offset));
        }
        let tail = self.tail_indices();
        let index = *tail.get(offset - self.user_queue.len())?;
        let removed = self.active()[index].clone();
        let current = self.current().cloned();
        self.context.retain(|t| t != &removed);
        self.shuffled.retain(|t| t != &removed);
        self.relocate(current.as_ref());
        Some(removed)
    }

    /// Move an entry of [`upcoming`](Self::upcoming) from `from` to `to`.
    ///
    /// Moves may cross between the user queue and the context tail. Returns
    /// `false` when either offset is out of range or the move would displace
    /// the current track.
    pub fn move_upcoming(&mut self, from: usize, to: usize) -> bool {
        let queued = self.user_queue.len();
        let total = queued + self.tail_indices().len();
        if from >= total || to >= total {
            return false;
        }
        if from == to {
            return true;
        }
        let current = self.current().cloned();

        match (from < queued, to < queued) {
            (true, true) => {
                let track = self.user_queue.remove(from);
                self.user_queue.insert(to, track);
            }
            (true, false) => {
                let track = self.user_queue[from].clone();
                if current.as_ref() == Some(&track) {
                    return false;
                }
                self.user_queue.remove(from);
                self.context.retain(|t| t != &track);
                self.shuffled.retain(|t| t != &track);
                self.relocate(current.as_ref());
                // Offsets past the user queue, which is now one shorter.
                self.insert_into_tail(to - (queued - 1), track);
            }
            (false, true) => {
                let index = self.tail_indices()[from - queued];
                let track = self.active()[index].clone();
                self.context.retain(|t| t != &track);
                self.shuffled.retain(|t| t != &track);
                self.relocate(current.as_ref());
                self.user_queue.insert(to, track);
            }
            (false, false) => {
                let index = self.tail_indices()[from - queued];
                let track = self.active_mut().remove(index);
                self.relocate(current.as_ref());
                self.insert_into_tail(to - queued, track);
            }
        }

        self.relocate(current.as_ref());
        true
    }

    /// Drop the user queue and everything after the current track.
    pub fn clear_upcoming(&mut self) {
        self.user_queue.clear();
        let Some(position) = self.position else {
            return;
        };
        if self.mode == PlayMode::Shuffle {
            let dropped: HashSet<TrackKey> = self
                .shuffled
                .drain(position + 1..)
                .map(|t| t.key)
                .collect();
            self.context.retain(|t| !dropped.contains(&t.key));
        } else {
            self.context.truncate(position + 1);
        }
    }

    pub fn clear(&mut self) {
        self.context.clear();
        self.shuffled.clear();
        self.user_queue.clear();
        self.position = None;
        self.source = PlaySource::Normal;
    }

    // ========================================================================
    // User Queue
    // ========================================================================

    /// Queue `track` to play before anything else in the user queue.
    pub fn play_next(&mut self, track: Track) {
        self.user_queue.retain(|t| t != &track);
        self.user_queue.insert(0, track);
    }

    /// Queue `track` at the end of the user queue. Returns `false` when it is
    /// already queued.
    pub fn add_to_queue(&mut self, track: Track) -> bool {
        if self.user_queue.contains(&track) {
            return false;
        }
        self.user_queue.push(track);
        true
    }

    pub fn remove_from_user_queue(&mut self, index: usize) -> Option<Track> {
        (index < self.user_queue.len()).then(|| self.user_queue.remove(index))
    }

    pub fn clear_user_queue(&mut self) {
        self.user_queue.clear();
    }

    // ========================================================================
    // Mode & Source
    // ========================================================================

    /// Change the play mode.
    ///
    /// Entering shuffle builds a fresh permutation with the current track
    /// first. Sources that force sequential order refuse shuffle and return
    /// `false`.
    pub fn set_mode(&mut self, mode: PlayMode) -> bool {
        if mode == PlayMode::Shuffle && self.source.forces_sequential() {
            return false;
        }
        if mode == self.mode {
            return true;
        }
        let current = self.current().cloned();
        if mode == PlayMode::Shuffle {
            self.shuffled = self.permutation_with_first(current.as_ref());
        } else {
            self.shuffled.clear();
        }
        self.mode = mode;
        self.relocate(current.as_ref());
        true
    }

    /// Advance to the next mode in the cycle, skipping shuffle where the
    /// source forbids it.
    pub fn switch_mode(&mut self) -> PlayMode {
        let mut next = self.mode.next();
        if next == PlayMode::Shuffle && self.source.forces_sequential() {
            next = next.next();
        }
        self.set_mode(next);
        self.mode
    }

    pub fn set_play_source(&mut self, source: PlaySource) {
        let sequential = source.forces_sequential();
        self.source = source;
        if sequential && self.mode != PlayMode::Sequential {
            self.set_mode(PlayMode::Sequential);
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Replace the whole queue with a persisted snapshot.
    ///
    /// Snapshot data is sanitized: duplicates are dropped, an inconsistent
    /// shuffled list is regenerated and the current track is re-located.
    pub fn restore(&mut self, snapshot: &QueueSnapshot) {
        self.source = snapshot.play_source.clone();
        self.mode = if self.source.forces_sequential() {
            PlayMode::Sequential
        } else {
            snapshot.mode
        };
        self.context = dedupe(snapshot.context.clone());
        self.user_queue = dedupe(snapshot.user_queue.clone());

        let current = snapshot.current_track.clone().or_else(|| {
            let list = if self.mode == PlayMode::Shuffle {
                &snapshot.shuffled_context
            } else {
                &snapshot.context
            };
            snapshot.position.and_then(|p| list.get(p).cloned())
        });
        if let Some(track) = &current {
            if !self.context.contains(track) {
                self.context.insert(0, track.clone());
            }
        }

        if self.mode == PlayMode::Shuffle {
            let shuffled = dedupe(snapshot.shuffled_context.clone());
            self.shuffled = if same_identities(&shuffled, &self.context) {
                shuffled
            } else {
                self.permutation_with_first(current.as_ref())
            };
        } else {
            self.shuffled.clear();
        }

        self.position = None;
        self.relocate(current.as_ref());
    }

    /// Check every structural invariant, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let active = self.active();
        match self.position {
            None if !active.is_empty() => {
                return Err("position unset on a non-empty queue".to_string())
            }
            Some(p) if p >= active.len() => {
                return Err(format!("position {p} out of range for {}", active.len()))
            }
            _ => {}
        }
        if dedupe(self.context.clone()).len() != self.context.len() {
            return Err("duplicate identity in context".to_string());
        }
        if self.mode == PlayMode::Shuffle {
            if !same_identities(&self.shuffled, &self.context) {
                return Err("shuffled context is not a permutation of context".to_string());
            }
        } else if !self.shuffled.is_empty() {
            return Err("shuffled context populated outside shuffle mode".to_string());
        }
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn active_mut(&mut self) -> &mut Vec<Track> {
        if self.mode == PlayMode::Shuffle {
            &mut self.shuffled
        } else {
            &mut self.context
        }
    }

    fn index_in_active(&self, track: &Track) -> Option<usize> {
        self.active().iter().position(|t| t == track)
    }

    /// Point `position` back at `current` after an edit, falling back to the
    /// first entry.
    fn relocate(&mut self, current: Option<&Track>) {
        let found = current.and_then(|t| self.index_in_active(t));
        self.position = match found {
            Some(index) => Some(index),
            None if self.active().is_empty() => None,
            None => Some(self.position.unwrap_or(0).min(self.active().len() - 1)),
        };
    }

    /// Active-list indices after `position` that are not shadowed by the
    /// user queue.
    fn tail_indices(&self) -> Vec<usize> {
        let Some(position) = self.position else {
            return Vec::new();
        };
        let queued: HashSet<&TrackKey> = self.user_queue.iter().map(|t| &t.key).collect();
        self.active()
            .iter()
            .enumerate()
            .skip(position + 1)
            .filter(|(_, t)| !queued.contains(&t.key))
            .map(|(i, _)| i)
            .collect()
    }

    /// Insert `track` so that it lands at offset `slot` of the visible tail.
    fn insert_into_tail(&mut self, slot: usize, track: Track) {
        let tail = self.tail_indices();
        let index = tail
            .get(slot)
            .copied()
            .unwrap_or_else(|| self.active().len());
        if self.mode == PlayMode::Shuffle {
            if !self.context.contains(&track) {
                self.context.push(track.clone());
            }
            self.shuffled.insert(index, track);
        } else {
            self.context.insert(index, track);
        }
    }

    /// Splice `block` after the current entry of both lists.
    fn splice_after_current(&mut self, block: &[Track]) {
        let current = self.current().cloned();
        let context_anchor = current
            .as_ref()
            .and_then(|t| self.context.iter().position(|c| c == t));
        splice_after(&mut self.context, context_anchor, block);
        if self.mode == PlayMode::Shuffle {
            splice_after(&mut self.shuffled, self.position, block);
        }
    }

    fn permutation_with_first(&mut self, first: Option<&Track>) -> Vec<Track> {
        let mut rest: Vec<Track> = self
            .context
            .iter()
            .filter(|t| Some(*t) != first)
            .cloned()
            .collect();
        rest.shuffle(&mut self.rng);
        if let Some(first) = first.filter(|t| self.context.contains(t)) {
            rest.insert(0, first.clone());
        }
        rest
    }
}

/// Remove prior occurrences of `block` from `list`, then insert it right
/// after `anchor`.
///
/// An occurrence at or before the anchor shifts the anchor back by one, so
/// the block always lands after the entry the anchor named.
fn splice_after(list: &mut Vec<Track>, anchor: Option<usize>, block: &[Track]) {
    let mut anchor = anchor.map_or(-1, |a| a as isize);
    for track in block {
        if let Some(index) = list.iter().position(|t| t == track) {
            list.remove(index);
            if index as isize <= anchor {
                anchor -= 1;
            }
        }
    }
    let at = ((anchor + 1).max(0) as usize).min(list.len());
    list.splice(at..at, block.iter().cloned());
}

fn dedupe(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.key.clone()))
        .collect()
}

fn same_identities(a: &[Track], b: &[Track]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let keys: HashSet<&TrackKey> = a.iter().map(|t| &t.key).collect();
    b.iter().all(|t| keys.contains(&t.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(TrackKey::primary(id), id.to_uppercase())
    }

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| track(id)).collect()
    }

    fn ids(list: &[Track]) -> Vec<&str> {
        list.iter().map(|t| t.key.id.as_str()).collect()
    }

    #[test]
    fn first_play_on_empty_queue() {
        let mut queue = QueueModel::with_seed(1);
        let a = track("a");
        queue.insert_after_current(vec![a.clone()], &a);

        assert_eq!(ids(queue.context()), vec!["a"]);
        assert_eq!(queue.position(), Some(0));
        assert_eq!(queue.current(), Some(&a));
    }

    #[test]
    fn insert_after_current_keeps_identities_unique() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c"]), None);

        let d = track("d");
        queue.insert_after_current(tracks(&["d", "e"]), &d);

        assert_eq!(ids(queue.context()), vec!["a", "d", "e", "b", "c"]);
        assert_eq!(queue.position(), Some(1));
        assert_eq!(queue.current(), Some(&d));
        queue.check_invariants().unwrap();
    }

    #[test]
    fn insert_after_current_moves_existing_occurrences() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c", "d"]), Some(&track("c")));

        // "a" sits before the current track and "d" after it.
        let a = track("a");
        queue.insert_after_current(tracks(&["a", "d"]), &a);

        assert_eq!(ids(queue.context()), vec!["b", "c", "a", "d"]);
        assert_eq!(queue.current(), Some(&a));
        assert_eq!(queue.position(), Some(2));
        queue.check_invariants().unwrap();
    }

    #[test]
    fn insert_including_current_track() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b"]), Some(&track("a")));

        let b = track("b");
        queue.insert_after_current(tracks(&["a", "b"]), &b);

        assert_eq!(ids(queue.context()), vec!["a", "b"]);
        assert_eq!(queue.current(), Some(&b));
        queue.check_invariants().unwrap();
    }

    #[test]
    fn set_context_prepends_missing_start() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "a"]), Some(&track("z")));
        assert_eq!(ids(queue.context()), vec!["z", "a", "b"]);
        assert_eq!(queue.position(), Some(0));
    }

    #[test]
    fn successor_prefers_user_queue_and_wraps() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b"]), Some(&track("b")));
        assert_eq!(queue.successor(), Some(track("a")));

        queue.add_to_queue(track("q"));
        assert_eq!(queue.successor(), Some(track("q")));
    }

    #[test]
    fn fm_never_wraps() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_play_source(PlaySource::Fm);
        queue.set_context(tracks(&["a", "b"]), Some(&track("b")));
        assert_eq!(queue.successor(), None);
        assert_eq!(queue.advance(), None);
        assert_eq!(queue.current(), Some(&track("b")));
    }

    #[test]
    fn advance_consumes_user_queue_into_context() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b"]), None);
        queue.add_to_queue(track("q"));

        assert_eq!(queue.advance(), Some(track("q")));
        assert!(queue.user_queue().is_empty());
        assert_eq!(ids(queue.context()), vec!["a", "q", "b"]);
        assert_eq!(queue.current(), Some(&track("q")));

        assert_eq!(queue.advance(), Some(track("b")));
        assert_eq!(queue.advance(), Some(track("a")));
        queue.check_invariants().unwrap();
    }

    #[test]
    fn retreat_wraps_to_end() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c"]), None);
        assert_eq!(queue.retreat(), Some(track("c")));
        assert_eq!(queue.retreat(), Some(track("b")));
    }

    #[test]
    fn upcoming_does_not_repeat_user_queue_entries() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c"]), None);
        queue.add_to_queue(track("c"));

        assert_eq!(ids(&queue.upcoming()), vec!["c", "b"]);
        assert!(queue.is_upcoming_index_in_user_queue(0));
        assert!(!queue.is_upcoming_index_in_user_queue(1));
    }

    #[test]
    fn play_next_jumps_ahead_of_queue() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a"]), None);
        queue.add_to_queue(track("x"));
        queue.add_to_queue(track("y"));
        queue.play_next(track("y"));

        assert_eq!(ids(queue.user_queue()), vec!["y", "x"]);
        assert!(!queue.add_to_queue(track("x")));
    }

    #[test]
    fn user_queue_edits_leave_context_alone() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b"]), None);
        queue.add_to_queue(track("x"));
        queue.add_to_queue(track("y"));

        assert_eq!(queue.remove_from_user_queue(3), None);
        assert_eq!(queue.remove_from_user_queue(0), Some(track("x")));
        assert_eq!(ids(queue.user_queue()), vec!["y"]);

        queue.clear_user_queue();
        assert!(queue.user_queue().is_empty());
        assert_eq!(ids(queue.context()), vec!["a", "b"]);
    }

    #[test]
    fn remove_upcoming_from_both_regions() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c", "d"]), None);
        queue.add_to_queue(track("q"));

        assert_eq!(queue.remove_upcoming(0), Some(track("q")));
        assert_eq!(queue.remove_upcoming(1), Some(track("c")));
        assert_eq!(ids(queue.context()), vec!["a", "b", "d"]);
        assert_eq!(queue.remove_upcoming(5), None);
        queue.check_invariants().unwrap();
    }

    #[test]
    fn move_within_context_tail() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c", "d"]), None);

        assert!(queue.move_upcoming(2, 0));
        assert_eq!(ids(&queue.upcoming()), vec!["d", "b", "c"]);
        assert_eq!(queue.current(), Some(&track("a")));
        queue.check_invariants().unwrap();
    }

    #[test]
    fn move_across_regions() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c"]), None);
        queue.add_to_queue(track("q"));

        // Upcoming: q | b c. Pull c into the user queue.
        assert!(queue.move_upcoming(2, 0));
        assert_eq!(ids(queue.user_queue()), vec!["c", "q"]);
        assert_eq!(ids(&queue.upcoming()), vec!["c", "q", "b"]);
        assert_eq!(ids(queue.context()), vec!["a", "b"]);

        // Push it back out to the end of the context.
        assert!(queue.move_upcoming(0, 2));
        assert_eq!(ids(queue.user_queue()), vec!["q"]);
        assert_eq!(ids(&queue.upcoming()), vec!["q", "b", "c"]);
        queue.check_invariants().unwrap();

        assert!(!queue.move_upcoming(0, 9));
    }

    #[test]
    fn clear_upcoming_keeps_history_part() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b", "c"]), Some(&track("b")));
        queue.add_to_queue(track("q"));
        queue.clear_upcoming();

        assert_eq!(ids(queue.context()), vec!["a", "b"]);
        assert!(queue.upcoming().is_empty());
        assert_eq!(queue.current(), Some(&track("b")));
    }

    #[test]
    fn shuffle_puts_current_first_and_restores_position() {
        let mut queue = QueueModel::with_seed(7);
        queue.set_context(tracks(&["a", "b", "c", "d", "e"]), Some(&track("c")));

        assert!(queue.set_mode(PlayMode::Shuffle));
        assert_eq!(queue.position(), Some(0));
        assert_eq!(queue.current(), Some(&track("c")));
        queue.check_invariants().unwrap();

        queue.set_mode(PlayMode::Sequential);
        assert_eq!(queue.position(), Some(2));
        assert!(queue.shuffled_context().is_empty());
    }

    #[test]
    fn shuffle_mode_edits_keep_permutation() {
        let mut queue = QueueModel::with_seed(3);
        queue.set_context(tracks(&["a", "b", "c"]), None);
        queue.set_mode(PlayMode::Shuffle);

        let x = track("x");
        queue.insert_after_current(tracks(&["x", "y"]), &x);
        assert_eq!(queue.current(), Some(&x));
        queue.check_invariants().unwrap();

        assert_eq!(queue.append_unique(tracks(&["a", "z"])), 1);
        queue.check_invariants().unwrap();

        queue.clear_upcoming();
        queue.check_invariants().unwrap();
        assert_eq!(queue.current(), Some(&x));
    }

    #[test]
    fn fm_skips_shuffle_in_mode_cycle() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_play_source(PlaySource::Fm);
        assert_eq!(queue.switch_mode(), PlayMode::RepeatOne);
        assert_eq!(queue.switch_mode(), PlayMode::Sequential);
        assert!(!queue.set_mode(PlayMode::Shuffle));
    }

    #[test]
    fn fm_source_forces_sequential() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b"]), None);
        queue.set_mode(PlayMode::Shuffle);
        queue.set_play_source(PlaySource::Fm);
        assert_eq!(queue.mode(), PlayMode::Sequential);
        queue.check_invariants().unwrap();
    }

    #[test]
    fn empty_queue_behaviour() {
        let mut queue = QueueModel::with_seed(1);
        assert_eq!(queue.position(), None);
        assert_eq!(queue.successor(), None);
        assert_eq!(queue.advance(), None);
        assert_eq!(queue.retreat(), None);
        assert!(!queue.move_upcoming(0, 0));
        queue.clear_upcoming();
        queue.check_invariants().unwrap();
    }

    #[test]
    fn focus_inserts_unknown_track_after_current() {
        let mut queue = QueueModel::with_seed(1);
        queue.set_context(tracks(&["a", "b"]), None);
        queue.add_to_queue(track("h"));

        queue.focus(&track("h"));
        assert_eq!(ids(queue.context()), vec!["a", "h", "b"]);
        assert!(queue.user_queue().is_empty());
        assert_eq!(queue.current(), Some(&track("h")));
    }

    #[test]
    fn randomized_edits_preserve_invariants() {
        use rand::Rng;

        let mut rng = StdRng::seed_from_u64(99);
        let mut queue = QueueModel::with_seed(5);
        let pool: Vec<Track> = (0..12).map(|i| track(&format!("t{i}"))).collect();

        for _ in 0..500 {
            let pick = |rng: &mut StdRng| pool[rng.gen_range(0..pool.len())].clone();
            match rng.gen_range(0..10) {
                0 => {
                    let start = pick(&mut rng);
                    queue.set_context(vec![pick(&mut rng), pick(&mut rng)], Some(&start));
                }
                1 => {
                    let now = pick(&mut rng);
                    queue.insert_after_current(vec![pick(&mut rng), now.clone()], &now);
                }
                2 => {
                    queue.append_unique(vec![pick(&mut rng), pick(&mut rng)]);
                }
                3 => {
                    let len = queue.upcoming().len() + 1;
                    queue.remove_upcoming(rng.gen_range(0..len));
                }
                4 => {
                    let len = queue.upcoming().len() + 1;
                    queue.move_upcoming(rng.gen_range(0..len), rng.gen_range(0..len));
                }
                5 => {
                    queue.add_to_queue(pick(&mut rng));
                }
                6 => {
                    queue.advance();
                }
                7 => {
                    queue.switch_mode();
                }
                8 => {
                    queue.retreat();
                }
                _ => {
                    if rng.gen_bool(0.1) {
                        queue.clear_upcoming();
                    }
                }
            }
            queue.check_invariants().unwrap();
        }
    }
}
