//! Cloneable front door to the orchestrator task.

use bridge_traits::{EngineEvent, Quality, Track};
use core_runtime::events::{CoreEvent, EventBus, EventStream, Receiver};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

use super::command::{Command, Envelope, Message};
use crate::error::{PlaybackError, Result};
use crate::state::PlayerState;

/// Default step for [`PlayerHandle::seek_forward`] and
/// [`PlayerHandle::seek_backward`].
pub const DEFAULT_SEEK_STEP: Duration = Duration::from_secs(15);

/// Sends commands to the orchestrator and exposes its observable state.
///
/// Every command method resolves once the orchestrator has applied the
/// command, not once playback has started; watch [`PlayerHandle::subscribe_state`]
/// or the event stream for the outcome of asynchronous work.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Envelope>,
    internal: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<PlayerState>,
    events: EventBus,
}

impl PlayerHandle {
    pub(super) fn new(
        commands: mpsc::Sender<Envelope>,
        internal: mpsc::UnboundedSender<Message>,
        state: watch::Receiver<PlayerState>,
        events: EventBus,
    ) -> Self {
        Self {
            commands,
            internal,
            state,
            events,
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply })
            .await
            .map_err(|_| PlaybackError::PlayerShutDown)?;
        response.await.map_err(|_| PlaybackError::PlayerShutDown)?
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Play `track` from `context`.
    ///
    /// Choosing the track that is already current toggles play/pause. On a
    /// non-empty queue, the context is inserted right after the current
    /// track instead of replacing the queue.
    pub async fn play(&self, track: Track, context: Vec<Track>) -> Result<()> {
        self.send(Command::Play { track, context }).await
    }

    /// Replace the context with `track` alone and play it.
    pub async fn play_single(&self, track: Track) -> Result<()> {
        self.send(Command::PlaySingle(track)).await
    }

    /// Switch to personal-radio mode and play `track`.
    pub async fn play_fm(&self, track: Track, context: Vec<Track>) -> Result<()> {
        self.send(Command::PlayFm { track, context }).await
    }

    /// Seed personal-radio mode without starting playback.
    pub async fn prepare_fm(&self, track: Track, context: Vec<Track>) -> Result<()> {
        self.send(Command::PrepareFm { track, context }).await
    }

    pub async fn play_podcast(
        &self,
        track: Track,
        context: Vec<Track>,
        radio_id: Option<String>,
    ) -> Result<()> {
        self.send(Command::PlayPodcast {
            track,
            context,
            radio_id,
        })
        .await
    }

    /// Play an entry picked from the upcoming list or from history.
    pub async fn play_from_queue(&self, track: Track) -> Result<()> {
        self.send(Command::PlayFromQueue(track)).await
    }

    pub async fn next(&self) -> Result<()> {
        self.send(Command::Next).await
    }

    /// Go back to the track left behind most recently, or one entry up the
    /// queue when there is none.
    pub async fn previous(&self) -> Result<()> {
        self.send(Command::Previous).await
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(Command::TogglePlayPause).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    /// Resume playback, loading the current track if nothing is loaded.
    pub async fn resume(&self) -> Result<()> {
        self.send(Command::Resume).await
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.send(Command::Seek(position)).await
    }

    pub async fn seek_forward(&self, step: Option<Duration>) -> Result<()> {
        self.send(Command::SeekForward(step.unwrap_or(DEFAULT_SEEK_STEP)))
            .await
    }

    pub async fn seek_backward(&self, step: Option<Duration>) -> Result<()> {
        self.send(Command::SeekBackward(step.unwrap_or(DEFAULT_SEEK_STEP)))
            .await
    }

    /// Cycle sequential, repeat-one, shuffle.
    pub async fn switch_mode(&self) -> Result<()> {
        self.send(Command::SwitchMode).await
    }

    /// Swap the current track to `quality` without an audible restart.
    pub async fn switch_quality(&self, quality: Quality) -> Result<()> {
        self.send(Command::SwitchQuality(quality)).await
    }

    pub async fn stop_and_clear(&self) -> Result<()> {
        self.send(Command::StopAndClear).await
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Queue `track` ahead of everything else in the user queue.
    pub async fn play_next(&self, track: Track) -> Result<()> {
        self.send(Command::PlayNext(track)).await
    }

    pub async fn add_to_queue(&self, track: Track) -> Result<()> {
        self.send(Command::AddToQueue(track)).await
    }

    /// Append tracks missing from the context, e.g. the next page of a list.
    pub async fn append_context(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(Command::AppendContext(tracks)).await
    }

    /// # Errors
    ///
    /// [`PlaybackError::InvalidIndex`] when `offset` is past the upcoming list.
    pub async fn remove_from_upcoming(&self, offset: usize) -> Result<()> {
        self.send(Command::RemoveFromUpcoming(offset)).await
    }

    pub async fn move_upcoming(&self, from: usize, to: usize) -> Result<()> {
        self.send(Command::MoveUpcoming { from, to }).await
    }

    pub async fn clear_upcoming(&self) -> Result<()> {
        self.send(Command::ClearUpcoming).await
    }

    pub async fn clear_user_queue(&self) -> Result<()> {
        self.send(Command::ClearUserQueue).await
    }

    pub async fn remove_from_user_queue(&self, index: usize) -> Result<()> {
        self.send(Command::RemoveFromUserQueue(index)).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Write the queue snapshot now instead of after the debounce window.
    pub async fn save_now(&self) -> Result<()> {
        self.send(Command::SaveNow).await
    }

    /// Flush state and stop the orchestrator. Later commands fail with
    /// [`PlaybackError::PlayerShutDown`].
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlayerState> {
        self.state.clone()
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Event stream narrowed by `predicate`.
    pub fn event_stream<F>(&self, predicate: F) -> EventStream
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        EventStream::new(self.events.subscribe()).filter(predicate)
    }

    pub fn is_in_user_queue(&self, track: &Track) -> bool {
        self.state.borrow().is_in_user_queue(track)
    }

    pub fn is_upcoming_index_in_user_queue(&self, index: usize) -> bool {
        self.state.borrow().is_upcoming_index_in_user_queue(index)
    }

    /// Sender for the host's audio engine callbacks.
    pub fn engine_events(&self) -> EngineEventSender {
        EngineEventSender {
            tx: self.internal.clone(),
        }
    }
}

/// Forwards [`EngineEvent`]s from the host audio engine into the
/// orchestrator.
#[derive(Clone)]
pub struct EngineEventSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl EngineEventSender {
    /// Returns `false` once the orchestrator has stopped.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(Message::Engine(event)).is_ok()
    }
}
