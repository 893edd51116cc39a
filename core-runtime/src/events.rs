//! # Event Bus System
//!
//! Broadcasts typed events from the playback core to any number of listeners
//! (UI layers, now-playing integration, lyric fetchers, analytics) using
//! `tokio::sync::broadcast`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐   subscribe   ┌────────────┐
//! │ Orchestrator ├────────────>│ EventBus  ├──────────────>│ Subscriber │
//! └──────────────┘             │ (broadcast│               └────────────┘
//!                              │  channel) │   subscribe   ┌────────────┐
//!                              │           ├──────────────>│ Subscriber │
//!                              └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     track_id: "primary:1".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Track completed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped, i.e. the player shut down.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback lifecycle events
    Playback(PlaybackEvent),
    /// Queue content and mode changes
    Queue(QueueEvent),
    /// User-facing failure alerts
    Alert(AlertEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Alert(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Warning,
            CoreEvent::Alert(_) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::TrackChanged { .. }) => EventSeverity::Info,
            CoreEvent::Queue(QueueEvent::Restored { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events describing what the player is doing.
///
/// Track ids are rendered as `catalog:id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The engine started rendering the current track.
    Started { track_id: String, title: String },
    /// Playback paused.
    Paused {
        track_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// Playback resumed after pause.
    Resumed { track_id: String, position_ms: u64 },
    /// Playback stopped and the queue cleared.
    Stopped { track_id: Option<String> },
    /// Track finished playing naturally.
    Completed { track_id: String },
    /// The current track changed. Lyric and now-playing services key off this.
    TrackChanged {
        track_id: String,
        title: String,
        /// True when the change was a gapless commit of a prepared buffer.
        gapless: bool,
    },
    /// A seek landed on the engine.
    PositionChanged {
        track_id: String,
        position_ms: u64,
        duration_ms: u64,
    },
    /// Stream quality switched for the current track.
    QualityChanged { track_id: String, quality: String },
    /// Playback error occurred.
    Error {
        track_id: Option<String>,
        message: String,
        /// Whether the player will keep going on its own.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::TrackChanged { .. } => "Current track changed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::QualityChanged { .. } => "Stream quality changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Queue Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// Queue contents changed.
    Changed {
        /// Entries ahead of the current track.
        upcoming: usize,
        /// Length of the primary list.
        context_len: usize,
    },
    ModeChanged { mode: String },
    /// A persisted queue was loaded at startup.
    Restored { tracks: usize },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Changed { .. } => "Queue changed",
            QueueEvent::ModeChanged { .. } => "Play mode changed",
            QueueEvent::Restored { .. } => "Queue restored",
        }
    }
}

// ============================================================================
// Alert Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AlertEvent {
    /// Automatic advancing stopped after repeated failures.
    FailureAlert {
        title: String,
        message: String,
        /// True when the cause was missing licensed content.
        unavailable: bool,
    },
}

impl AlertEvent {
    fn description(&self) -> &str {
        match self {
            AlertEvent::FailureAlert { .. } => "Playback failure alert",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// Fails when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver for all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let alerts = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Alert(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by [`EventStream::recv`].
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events
    /// and `RecvError::Closed` once all senders are dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Non-blocking receive of the next matching event, if one is buffered.
    pub fn try_recv(&mut self) -> Option<CoreEvent> {
        loop {
            let event = self.receiver.try_recv().ok()?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Some(event),
            }
        }
    }
}
