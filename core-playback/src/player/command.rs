//! Messages flowing into the orchestrator task.

use bridge_traits::{EngineEvent, PlayableSource, Quality, ResolveError, Track};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::session::SessionToken;

/// Why a track is being loaded.
///
/// Only auto-advancing loads feed the retry policy. A track the listener
/// picked explicitly reports its failure without skipping ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// The listener chose this exact track.
    Selection,
    /// The queue moved on: natural end, skip, retry or reload.
    Advance,
}

/// Public operations, one per [`PlayerHandle`](super::PlayerHandle) method.
#[derive(Debug)]
pub(super) enum Command {
    Play { track: Track, context: Vec<Track> },
    PlaySingle(Track),
    PlayNext(Track),
    AddToQueue(Track),
    AppendContext(Vec<Track>),
    PlayFm { track: Track, context: Vec<Track> },
    PrepareFm { track: Track, context: Vec<Track> },
    PlayPodcast {
        track: Track,
        context: Vec<Track>,
        radio_id: Option<String>,
    },
    PlayFromQueue(Track),
    RemoveFromUpcoming(usize),
    MoveUpcoming { from: usize, to: usize },
    ClearUpcoming,
    ClearUserQueue,
    RemoveFromUserQueue(usize),
    Next,
    Previous,
    SwitchMode,
    SwitchQuality(Quality),
    Seek(Duration),
    SeekForward(Duration),
    SeekBackward(Duration),
    TogglePlayPause,
    Pause,
    Resume,
    StopAndClear,
    SaveNow,
    Shutdown,
}

pub(super) struct Envelope {
    pub command: Command,
    pub reply: oneshot::Sender<Result<()>>,
}

/// Results and signals produced off the orchestrator task.
#[derive(Debug)]
pub(super) enum Message {
    Engine(EngineEvent),
    Resolved {
        token: SessionToken,
        track: Track,
        origin: LoadOrigin,
        start_at: Duration,
        result: std::result::Result<PlayableSource, ResolveError>,
    },
    Preloaded {
        epoch: SessionToken,
        result: std::result::Result<PlayableSource, ResolveError>,
    },
    QualityPoll {
        epoch: SessionToken,
        attempt: u32,
    },
    RetryDue {
        token: SessionToken,
    },
    SeekDue {
        generation: u64,
        target: Duration,
    },
}
