//! # Player Orchestrator
//!
//! The public surface of the playback core.
//!
//! ## Architecture
//!
//! ```text
//!   PlayerHandle ──Envelope──> ┌──────────────────────┐ ──resolve──> SourceResolver
//!   (cloneable)    (bounded)   │     Orchestrator     │ ──play/prepare──> AudioEngine
//!                              │  (single tokio task) │ ──set/get──> KeyValueStore
//!   EngineEventSender ───────> │                      │ ──notify──> NotificationSink
//!   resolver tasks, timers ──> └──────────┬───────────┘
//!             (Message, unbounded)        │ watch::Sender<PlayerState>
//!                                         │ EventBus (CoreEvent)
//!                                         v
//!                                   UI subscribers
//! ```
//!
//! All queue mutations and all callback processing happen on the orchestrator
//! task, one message at a time. Source resolution runs on spawned tasks that
//! post their result back as a [`Message`](command::Message) tagged with the
//! session token or transition epoch captured at request time; the
//! orchestrator drops results whose tag is no longer current.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let player = Player::spawn(dependencies, PlaybackConfig::default())?;
//! let handle = player.handle();
//!
//! handle.play(track.clone(), album_tracks).await?;
//! let mut state = handle.subscribe_state();
//! state.changed().await?;
//!
//! // Host audio callbacks:
//! let engine_events = handle.engine_events();
//! engine_events.send(EngineEvent::Finished);
//!
//! player.shutdown().await?;
//! ```

mod actor;
mod command;
mod handle;
mod queue_ops;
mod transitions;

pub use command::LoadOrigin;
pub use handle::{EngineEventSender, PlayerHandle, DEFAULT_SEEK_STEP};

use bridge_traits::{
    AudioEngine, Clock, KeyValueStore, NotificationSink, Quality, SourceResolver, SystemClock,
    Track,
};
use core_runtime::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::PlaybackConfig;
use crate::debounce::TimerSlot;
use crate::error::{PlaybackError, Result};
use crate::history::{BackStack, PlayHistory};
use crate::persistence::PersistenceGateway;
use crate::queue::QueueModel;
use crate::retry::{AbnormalStopGuard, RetryPolicy};
use crate::seek::SeekCoordinator;
use crate::session::SessionGuard;
use crate::state::PlayerState;
use crate::transition::TransitionCoordinator;
use command::{Envelope, Message};

/// Host collaborators the orchestrator drives.
#[derive(Clone)]
pub struct PlayerDependencies {
    pub resolver: Arc<dyn SourceResolver>,
    pub engine: Arc<dyn AudioEngine>,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
    pub events: EventBus,
}

impl PlayerDependencies {
    pub fn new(
        resolver: Arc<dyn SourceResolver>,
        engine: Arc<dyn AudioEngine>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            resolver,
            engine,
            store,
            notifier,
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }
}

/// A running orchestrator task and the handle that drives it.
pub struct Player {
    handle: PlayerHandle,
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Player {
    /// Validate `config`, restore the persisted queue and start the
    /// orchestrator task.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] when validation fails.
    pub fn spawn(dependencies: PlayerDependencies, config: PlaybackConfig) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlayerState {
            quality: config.initial_quality,
            ..Default::default()
        });
        let cancel = CancellationToken::new();

        let handle = PlayerHandle::new(
            command_tx,
            internal_tx.clone(),
            state_rx,
            dependencies.events.clone(),
        );
        let orchestrator = Orchestrator::new(dependencies, config, internal_tx, state_tx);
        let task = tokio::spawn(orchestrator.run(command_rx, internal_rx, cancel.clone()));

        Ok(Self {
            handle,
            task,
            cancel,
        })
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Flush the queue snapshot and stop the orchestrator.
    pub async fn shutdown(self) -> Result<()> {
        let result = self.handle.shutdown().await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Player task ended abnormally");
            return Err(PlaybackError::Internal(e.to_string()));
        }
        result
    }

    /// Stop the orchestrator without flushing state.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Orchestrator state. Owned by exactly one task.
struct Orchestrator {
    resolver: Arc<dyn SourceResolver>,
    engine: Arc<dyn AudioEngine>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: PlaybackConfig,

    queue: QueueModel,
    session: SessionGuard,
    retry: RetryPolicy,
    abnormal: AbnormalStopGuard,
    transition: TransitionCoordinator,
    seek: SeekCoordinator,
    persistence: PersistenceGateway,
    history: PlayHistory,
    back_stack: BackStack,

    seek_timer: TimerSlot,
    retry_timer: TimerSlot,
    quality_poll: TimerSlot,

    quality: Quality,
    /// The track the engine was last asked to play.
    now_playing: Option<Track>,
    is_playing: bool,
    is_loading: bool,
    /// The engine holds a started source for `now_playing`.
    loaded: bool,
    current_time: Duration,
    duration: Duration,

    internal_tx: mpsc::UnboundedSender<Message>,
    state_tx: watch::Sender<PlayerState>,
}

impl Orchestrator {
    fn new(
        dependencies: PlayerDependencies,
        config: PlaybackConfig,
        internal_tx: mpsc::UnboundedSender<Message>,
        state_tx: watch::Sender<PlayerState>,
    ) -> Self {
        Self {
            resolver: dependencies.resolver,
            engine: dependencies.engine,
            notifier: dependencies.notifier,
            clock: dependencies.clock,
            events: dependencies.events,

            queue: QueueModel::new(),
            session: SessionGuard::new(),
            retry: RetryPolicy::from_config(&config),
            abnormal: AbnormalStopGuard::new(config.abnormal_stop_limit),
            transition: TransitionCoordinator::new(),
            seek: SeekCoordinator::new(config.seek_tolerance(), config.seek_confirm_timeout()),
            persistence: PersistenceGateway::new(dependencies.store, &config),
            history: PlayHistory::new(config.history_limit),
            back_stack: BackStack::new(config.back_stack_limit),

            seek_timer: TimerSlot::new(),
            retry_timer: TimerSlot::new(),
            quality_poll: TimerSlot::new(),

            quality: config.initial_quality,
            now_playing: None,
            is_playing: false,
            is_loading: false,
            loaded: false,
            current_time: Duration::ZERO,
            duration: Duration::ZERO,

            internal_tx,
            state_tx,
            config,
        }
    }
}
