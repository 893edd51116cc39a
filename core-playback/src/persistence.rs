//! # Persistence Gateway
//!
//! Writes a bounded snapshot of the queue to the host [`KeyValueStore`] and
//! restores it at startup.
//!
//! ## Writes
//!
//! - [`PersistenceGateway::schedule`] debounces: every call replaces the
//!   pending write, so a burst of queue edits produces one write.
//! - [`PersistenceGateway::save_now`] cancels the pending write and writes
//!   immediately (app suspend, shutdown).
//! - Failures are logged and dropped. A failed write is not retried; the next
//!   queue edit schedules a fresh one.
//!
//! ## Schema history
//!
//! | Version | Shape |
//! |---------|-------|
//! | 1 | Separate `player.current_track` and `player.user_queue` keys |
//! | 2 | Single document with the current track, user queue, mode and history |
//! | 3 | Full queue: context, shuffled context, position, back stack, quality |
//!
//! Older shapes are migrated by treating the lone current track as a
//! single-element context.

use bridge_traits::{KeyValueStore, Quality, Track};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::debounce::TimerSlot;
use crate::error::{PlaybackError, Result};
use crate::model::{PlayMode, PlaySource};

pub const SNAPSHOT_KEY: &str = "player.queue.v3";
pub const LEGACY_TRACK_KEY: &str = "player.current_track";
pub const LEGACY_USER_QUEUE_KEY: &str = "player.user_queue";
pub const SCHEMA_VERSION: u32 = 3;

/// Persisted copy of the queue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "StoredSnapshot")]
pub struct QueueSnapshot {
    pub schema_version: u32,
    pub current_track: Option<Track>,
    pub context: Vec<Track>,
    pub shuffled_context: Vec<Track>,
    /// Index into the active list (`shuffled_context` in shuffle mode).
    pub position: Option<usize>,
    pub user_queue: Vec<Track>,
    pub mode: PlayMode,
    pub play_source: PlaySource,
    /// Most recent first.
    pub history: Vec<Track>,
    /// Oldest first.
    pub back_stack: Vec<Track>,
    pub quality: Option<Quality>,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Length caps applied before a snapshot is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLimits {
    pub context: usize,
    pub history: usize,
    pub back_stack: usize,
}

impl SnapshotLimits {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            context: config.context_limit,
            history: config.history_limit,
            back_stack: config.back_stack_limit,
        }
    }
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.current_track.is_none() && self.context.is_empty() && self.user_queue.is_empty()
    }

    /// Apply the length caps.
    ///
    /// Context lists are cut to a window that keeps the current track, with
    /// `position` rebased onto the window.
    pub fn bounded(mut self, limits: SnapshotLimits) -> Self {
        let shuffle = self.mode == PlayMode::Shuffle;
        let context_anchor = self
            .current_track
            .as_ref()
            .and_then(|t| self.context.iter().position(|c| c == t));
        let shuffled_anchor = self
            .current_track
            .as_ref()
            .and_then(|t| self.shuffled_context.iter().position(|c| c == t));

        let context_pos = window(&mut self.context, context_anchor, limits.context);
        let shuffled_pos = window(&mut self.shuffled_context, shuffled_anchor, limits.context);
        if self.current_track.is_some() {
            self.position = if shuffle { shuffled_pos } else { context_pos };
        } else {
            let len = if shuffle {
                self.shuffled_context.len()
            } else {
                self.context.len()
            };
            self.position = self.position.filter(|p| *p < len);
        }

        self.history.truncate(limits.history);
        if self.back_stack.len() > limits.back_stack {
            let excess = self.back_stack.len() - limits.back_stack;
            self.back_stack.drain(..excess);
        }
        self
    }
}

/// Keep at most `max` entries around `anchor`, returning the rebased anchor.
fn window(list: &mut Vec<Track>, anchor: Option<usize>, max: usize) -> Option<usize> {
    if list.len() <= max {
        return anchor;
    }
    let start = anchor
        .map_or(0, |a| a.saturating_sub(max / 2))
        .min(list.len() - max);
    list.drain(..start);
    list.truncate(max);
    anchor.map(|a| a - start)
}

/// On-disk shape accepted by the reader: every historical field name, every
/// field optional.
#[derive(Debug, Deserialize)]
struct StoredSnapshot {
    #[serde(default, alias = "schemaVersion")]
    schema_version: u32,
    #[serde(default, alias = "currentSong", alias = "currentTrack")]
    current_track: Option<Track>,
    #[serde(default)]
    context: Option<Vec<Track>>,
    #[serde(default, alias = "shuffledContext")]
    shuffled_context: Option<Vec<Track>>,
    #[serde(default, alias = "contextIndex")]
    position: Option<i64>,
    #[serde(default, alias = "userQueue")]
    user_queue: Option<Vec<Track>>,
    #[serde(default)]
    mode: PlayMode,
    #[serde(default, alias = "playSource")]
    play_source: Option<PlaySource>,
    #[serde(default)]
    history: Option<Vec<Track>>,
    #[serde(default, alias = "playbackBackStack", alias = "backStack")]
    back_stack: Option<Vec<Track>>,
    #[serde(default)]
    quality: Option<Quality>,
    #[serde(default, alias = "savedAt")]
    saved_at: Option<DateTime<Utc>>,
}

impl From<StoredSnapshot> for QueueSnapshot {
    fn from(stored: StoredSnapshot) -> Self {
        let mut context = stored.context.unwrap_or_default();
        let mut position = stored
            .position
            .and_then(|p| usize::try_from(p).ok());

        // Pre-v3 documents only carried the current track.
        if context.is_empty() {
            if let Some(track) = &stored.current_track {
                context.push(track.clone());
                position = Some(0);
            }
        }

        QueueSnapshot {
            schema_version: SCHEMA_VERSION.max(stored.schema_version),
            current_track: stored.current_track,
            context,
            shuffled_context: stored.shuffled_context.unwrap_or_default(),
            position,
            user_queue: stored.user_queue.unwrap_or_default(),
            mode: stored.mode,
            play_source: stored.play_source.unwrap_or_default(),
            history: stored.history.unwrap_or_default(),
            back_stack: stored.back_stack.unwrap_or_default(),
            quality: stored.quality,
            saved_at: stored.saved_at,
        }
    }
}

/// Debounced snapshot writer and startup reader.
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    limits: SnapshotLimits,
    debounce: Duration,
    ttl: Option<Duration>,
    enabled: bool,
    pending: TimerSlot,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &PlaybackConfig) -> Self {
        Self {
            store,
            limits: SnapshotLimits::from_config(config),
            debounce: config.save_debounce(),
            ttl: config.snapshot_ttl(),
            enabled: config.persistence,
            pending: TimerSlot::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending.is_pending()
    }

    /// Write `snapshot` once no newer snapshot arrives within the debounce
    /// window.
    pub fn schedule(&mut self, snapshot: QueueSnapshot) {
        if !self.enabled {
            return;
        }
        let store = self.store.clone();
        let ttl = self.ttl;
        let snapshot = snapshot.bounded(self.limits);
        self.pending.schedule_after(self.debounce, async move {
            if let Err(e) = write_snapshot(store.as_ref(), &snapshot, ttl).await {
                warn!(error = %e, "Debounced queue snapshot write failed");
            }
        });
    }

    /// Write `snapshot` immediately, dropping any pending debounced write.
    pub async fn save_now(&mut self, snapshot: QueueSnapshot) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.pending.cancel();
        let snapshot = snapshot.bounded(self.limits);
        write_snapshot(self.store.as_ref(), &snapshot, self.ttl)
            .await
            .map_err(|e| {
                warn!(error = %e, "Queue snapshot write failed");
                e
            })
    }

    /// Read the persisted snapshot, migrating legacy keys when no current
    /// snapshot exists. Unreadable data restores as nothing.
    pub async fn restore(&self) -> Option<QueueSnapshot> {
        if !self.enabled {
            return None;
        }
        match self.store.get(SNAPSHOT_KEY).await {
            Ok(Some(bytes)) => {
                return match serde_json::from_slice::<QueueSnapshot>(&bytes) {
                    Ok(snapshot) => {
                        debug!(
                            tracks = snapshot.context.len(),
                            version = snapshot.schema_version,
                            "Restored queue snapshot"
                        );
                        Some(snapshot)
                    }
                    Err(e) => {
                        warn!(error = %e, "Discarding unreadable queue snapshot");
                        None
                    }
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to read queue snapshot");
                return None;
            }
        }
        self.migrate_legacy().await
    }

    async fn migrate_legacy(&self) -> Option<QueueSnapshot> {
        let track: Option<Track> = self.read_legacy(LEGACY_TRACK_KEY).await;
        let user_queue: Vec<Track> = self
            .read_legacy(LEGACY_USER_QUEUE_KEY)
            .await
            .unwrap_or_default();
        if track.is_none() && user_queue.is_empty() {
            return None;
        }

        let snapshot = QueueSnapshot {
            schema_version: SCHEMA_VERSION,
            context: track.iter().cloned().collect(),
            position: track.as_ref().map(|_| 0),
            current_track: track,
            user_queue,
            ..Default::default()
        };
        info!(
            has_track = snapshot.current_track.is_some(),
            queued = snapshot.user_queue.len(),
            "Migrating legacy player state"
        );

        match write_snapshot(self.store.as_ref(), &snapshot, self.ttl).await {
            Ok(()) => {
                for key in [LEGACY_TRACK_KEY, LEGACY_USER_QUEUE_KEY] {
                    if let Err(e) = self.store.remove(key).await {
                        warn!(key, error = %e, "Failed to remove legacy key");
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to write migrated snapshot"),
        }
        Some(snapshot)
    }

    async fn read_legacy<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read legacy key");
                return None;
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| warn!(key, error = %e, "Ignoring unreadable legacy value"))
            .ok()
    }
}

async fn write_snapshot(
    store: &dyn KeyValueStore,
    snapshot: &QueueSnapshot,
    ttl: Option<Duration>,
) -> Result<()> {
    let bytes = serde_json::to_vec(snapshot)?;
    store
        .set(SNAPSHOT_KEY, Bytes::from(bytes), ttl)
        .await
        .map_err(|e| PlaybackError::Persistence(e.to_string()))?;
    debug!(tracks = snapshot.context.len(), "Wrote queue snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, TrackKey};
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    mock! {
        pub Store {}

        #[async_trait]
        impl KeyValueStore for Store {
            async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>>;
            async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> BridgeResult<()>;
            async fn remove(&self, key: &str) -> BridgeResult<()>;
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, Bytes>>,
        writes: AtomicUsize,
    }

    impl MemoryStore {
        fn put_json<T: Serialize>(&self, key: &str, value: &T) {
            let bytes = Bytes::from(serde_json::to_vec(value).unwrap());
            self.entries.lock().unwrap().insert(key.to_string(), bytes);
        }

        fn has(&self, key: &str) -> bool {
            self.entries.lock().unwrap().contains_key(key)
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: Bytes, _ttl: Option<Duration>) -> BridgeResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn remove(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn track(id: &str) -> Track {
        Track::new(TrackKey::primary(id), id)
    }

    fn snapshot_with(ids: &[&str], current: &str) -> QueueSnapshot {
        let context: Vec<Track> = ids.iter().map(|id| track(id)).collect();
        QueueSnapshot {
            schema_version: SCHEMA_VERSION,
            position: context.iter().position(|t| t.key.id == current),
            current_track: Some(track(current)),
            context,
            ..Default::default()
        }
    }

    #[test]
    fn bounded_windows_around_current_track() {
        let ids: Vec<String> = (0..300).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut snapshot = snapshot_with(&refs, "250");
        snapshot.history = (0..80).map(|i| track(&format!("h{i}"))).collect();
        snapshot.back_stack = (0..260).map(|i| track(&format!("b{i}"))).collect();

        let limits = SnapshotLimits {
            context: 200,
            history: 50,
            back_stack: 200,
        };
        let bounded = snapshot.bounded(limits);

        assert_eq!(bounded.context.len(), 200);
        let position = bounded.position.unwrap();
        assert_eq!(bounded.context[position].key.id, "250");
        assert_eq!(bounded.history.len(), 50);
        assert_eq!(bounded.back_stack.len(), 200);
        assert_eq!(bounded.back_stack.last().unwrap().key.id, "b259");
    }

    #[test]
    fn lone_track_document_migrates_to_single_context() {
        let json = r#"{
            "currentSong": {"key": {"catalog": "secondary", "id": "9"}, "title": "Old"},
            "userQueue": [],
            "mode": "loopSingle",
            "history": [{"key": {"id": "1"}}],
            "playSource": {"kind": "fm"}
        }"#;
        let snapshot: QueueSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.context, vec![Track::new(TrackKey::secondary("9"), "")]);
        assert_eq!(snapshot.position, Some(0));
        assert_eq!(snapshot.mode, PlayMode::RepeatOne);
        assert_eq!(snapshot.play_source, PlaySource::Fm);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn negative_index_means_no_position() {
        let snapshot: QueueSnapshot =
            serde_json::from_str(r#"{"context": [], "contextIndex": -1}"#).unwrap();
        assert_eq!(snapshot.position, None);
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn save_and_restore_round_trip() {
        let store = Arc::new(MemoryStore::default());
        let mut gateway = PersistenceGateway::new(store.clone(), &PlaybackConfig::default());

        let mut snapshot = snapshot_with(&["a", "b", "c"], "b");
        snapshot.quality = Some(Quality::Lossless);
        gateway.save_now(snapshot.clone()).await.unwrap();

        let restored = gateway.restore().await.unwrap();
        assert_eq!(restored, snapshot);
    }

    #[tokio::test]
    async fn restore_migrates_legacy_keys() {
        let store = Arc::new(MemoryStore::default());
        store.put_json(LEGACY_TRACK_KEY, &track("old"));
        store.put_json(LEGACY_USER_QUEUE_KEY, &vec![track("q1")]);
        let gateway = PersistenceGateway::new(store.clone(), &PlaybackConfig::default());

        let restored = gateway.restore().await.unwrap();
        assert_eq!(restored.context, vec![track("old")]);
        assert_eq!(restored.user_queue, vec![track("q1")]);

        assert!(store.has(SNAPSHOT_KEY));
        assert!(!store.has(LEGACY_TRACK_KEY));
        assert!(!store.has(LEGACY_USER_QUEUE_KEY));
    }

    #[tokio::test]
    async fn unreadable_snapshot_restores_nothing() {
        let store = Arc::new(MemoryStore::default());
        store
            .entries
            .lock()
            .unwrap()
            .insert(SNAPSHOT_KEY.to_string(), Bytes::from_static(b"{not json"));
        let gateway = PersistenceGateway::new(store, &PlaybackConfig::default());
        assert!(gateway.restore().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_saves_writes_once() {
        let store = Arc::new(MemoryStore::default());
        let mut gateway = PersistenceGateway::new(store.clone(), &PlaybackConfig::default());

        for i in 0..5 {
            gateway.schedule(snapshot_with(&["a", "b"], if i % 2 == 0 { "a" } else { "b" }));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.restore().await.unwrap().current_track,
            Some(track("a"))
        );
    }

    #[tokio::test]
    async fn write_failure_is_reported_but_not_retried() {
        let mut store = MockStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(BridgeError::StorageError("disk full".into())));
        let mut gateway = PersistenceGateway::new(Arc::new(store), &PlaybackConfig::default());

        let result = gateway.save_now(snapshot_with(&["a"], "a")).await;
        assert!(matches!(result, Err(PlaybackError::Persistence(_))));
    }

    #[tokio::test]
    async fn disabled_gateway_never_touches_store() {
        let store = MockStore::new();
        let mut gateway = PersistenceGateway::new(Arc::new(store), &PlaybackConfig::ephemeral());

        gateway.save_now(snapshot_with(&["a"], "a")).await.unwrap();
        gateway.schedule(snapshot_with(&["a"], "a"));
        assert!(gateway.restore().await.is_none());
        assert!(!gateway.has_pending_write());
    }
}
