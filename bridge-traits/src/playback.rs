//! Audio engine bridge.
//!
//! The engine owns decoding and output. The core drives it through
//! [`AudioEngine`] and learns about lifecycle changes through
//! [`EngineEvent`]s that the host forwards into the player.
//!
//! Engines are expected to hold two buffers: the one currently rendering and
//! a secondary buffer filled by [`AudioEngine::prepare_next`]. A call to
//! [`AudioEngine::commit_to_prepared`] swaps the secondary buffer in without
//! an audible gap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::media::PlayableSource;

/// Lifecycle signals emitted by the audio engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EngineEvent {
    /// The primary buffer started rendering audio.
    Started,
    /// The secondary buffer is ready to be committed.
    NextPrepared,
    /// The primary buffer reached its natural end.
    Finished,
    /// The total duration of the primary buffer became known.
    DurationKnown(Duration),
    /// Decoding or output failed for the primary buffer.
    Failed(String),
}

/// Low-level playback engine.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Replace whatever is playing with `source` and start rendering.
    async fn play(&self, source: &PlayableSource) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Stop rendering and release the primary buffer.
    async fn stop(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    /// Start filling the secondary buffer without touching current playback.
    ///
    /// Readiness is reported with [`EngineEvent::NextPrepared`] and can also be
    /// queried with [`AudioEngine::is_next_prepared`].
    async fn prepare_next(&self, source: &PlayableSource) -> Result<()>;

    /// Abandon any in-flight or completed secondary buffer.
    async fn cancel_next_preparation(&self) -> Result<()>;

    /// Switch to the secondary buffer, optionally seeking it first.
    ///
    /// # Errors
    ///
    /// Fails when no secondary buffer is ready.
    async fn commit_to_prepared(&self, seek_to: Option<Duration>) -> Result<()>;

    /// Whether the secondary buffer is ready to commit.
    fn is_next_prepared(&self) -> bool;

    /// Playback position of the primary buffer.
    fn current_time(&self) -> Duration;
}
