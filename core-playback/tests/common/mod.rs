//! Host fakes shared by the player integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    Alert, AudioEngine, KeyValueStore, NotificationSink, PlayableSource, Quality, ResolveError,
    SourceResolver, Track, TrackKey,
};
use bytes::Bytes;
use core_playback::{PlaybackConfig, Player, PlayerDependencies, PlayerState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const WAIT: Duration = Duration::from_secs(60);

pub fn track(id: &str) -> Track {
    Track::new(TrackKey::primary(id), id.to_uppercase())
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn ids(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.key.id.clone()).collect()
}

/// URL the fake resolver hands out for `id` at `quality`.
pub fn url(id: &str, quality: Quality) -> String {
    format!("{}@{:?}", TrackKey::primary(id), quality)
}

// ============================================================================
// Audio Engine
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct EngineLog {
    pub plays: Vec<String>,
    pub seeks: Vec<Duration>,
    pub prepared: Vec<String>,
    pub commits: Vec<Option<Duration>>,
    pub cancels: usize,
    pub stops: usize,
    pub pauses: usize,
    pub resumes: usize,
}

#[derive(Default)]
struct EngineInner {
    log: EngineLog,
    current_time: Duration,
    next_ready: bool,
    fail_play: bool,
}

#[derive(Default)]
pub struct FakeEngine {
    inner: Mutex<EngineInner>,
}

impl FakeEngine {
    pub fn log(&self) -> EngineLog {
        self.inner.lock().log.clone()
    }

    pub fn set_current_time(&self, position: Duration) {
        self.inner.lock().current_time = position;
    }

    pub fn set_next_ready(&self, ready: bool) {
        self.inner.lock().next_ready = ready;
    }

    pub fn fail_play(&self, fail: bool) {
        self.inner.lock().fail_play = fail;
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn play(&self, source: &PlayableSource) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_play {
            return Err(BridgeError::OperationFailed("decoder refused source".into()));
        }
        inner.log.plays.push(source.url.clone());
        inner.current_time = Duration::ZERO;
        inner.next_ready = false;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.inner.lock().log.pauses += 1;
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        self.inner.lock().log.resumes += 1;
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.inner.lock().log.stops += 1;
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        inner.log.seeks.push(position);
        inner.current_time = position;
        Ok(())
    }

    async fn prepare_next(&self, source: &PlayableSource) -> BridgeResult<()> {
        self.inner.lock().log.prepared.push(source.url.clone());
        Ok(())
    }

    async fn cancel_next_preparation(&self) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        inner.log.cancels += 1;
        inner.next_ready = false;
        Ok(())
    }

    async fn commit_to_prepared(&self, seek_to: Option<Duration>) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        inner.log.commits.push(seek_to);
        inner.current_time = seek_to.unwrap_or_default();
        inner.next_ready = false;
        Ok(())
    }

    fn is_next_prepared(&self) -> bool {
        self.inner.lock().next_ready
    }

    fn current_time(&self) -> Duration {
        self.inner.lock().current_time
    }
}

// ============================================================================
// Resolver
// ============================================================================

#[derive(Default)]
pub struct FakeResolver {
    failures: Mutex<HashMap<String, ResolveError>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, Quality)>>,
}

impl FakeResolver {
    pub fn fail(&self, id: &str, error: ResolveError) {
        self.failures.lock().insert(id.to_string(), error);
    }

    pub fn delay(&self, id: &str, delay: Duration) {
        self.delays.lock().insert(id.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, Quality)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SourceResolver for FakeResolver {
    async fn resolve(
        &self,
        track: &Track,
        quality: Quality,
    ) -> Result<PlayableSource, ResolveError> {
        let id = track.key.id.clone();
        self.calls.lock().push((id.clone(), quality));
        let delay = self.delays.lock().get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().get(&id).cloned();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(PlayableSource::new(url(&id, quality), quality))
    }
}

// ============================================================================
// Storage & Notifications
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Bytes>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }

    pub fn raw(&self, key: &str) -> Option<Bytes> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: impl Into<Bytes>) {
        self.entries.lock().insert(key.to_string(), value.into());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes, _ttl: Option<Duration>) -> BridgeResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        *self.writes.lock() += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, alert: Alert) -> BridgeResult<()> {
        self.alerts.lock().push(alert);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub resolver: Arc<FakeResolver>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            engine: Arc::new(FakeEngine::default()),
            resolver: Arc::new(FakeResolver::default()),
            store: Arc::new(MemoryStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }
}

impl Harness {
    pub fn dependencies(&self) -> PlayerDependencies {
        PlayerDependencies::new(
            self.resolver.clone(),
            self.engine.clone(),
            self.store.clone(),
            self.notifier.clone(),
        )
    }

    pub fn spawn(&self, config: PlaybackConfig) -> Player {
        Player::spawn(self.dependencies(), config).expect("valid config")
    }
}

/// Wait until `predicate` holds for the published state.
pub async fn wait_for<F>(state: &mut watch::Receiver<PlayerState>, predicate: F) -> PlayerState
where
    F: FnMut(&PlayerState) -> bool,
{
    tokio::time::timeout(WAIT, state.wait_for(predicate))
        .await
        .expect("timed out waiting for player state")
        .expect("player stopped")
        .clone()
}

/// Wait until `id` is the current track and actually playing.
pub async fn wait_playing(state: &mut watch::Receiver<PlayerState>, id: &str) -> PlayerState {
    let id = id.to_string();
    wait_for(state, move |s| {
        s.is_playing
            && !s.is_loading
            && s.current_track.as_ref().is_some_and(|t| t.key.id == id)
    })
    .await
}

/// Let spawned tasks and short timers run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
