//! Orchestrator run loop, loading and engine callbacks.

use bridge_traits::{Alert, AlertKind, EngineEvent, PlayableSource, ResolveError, Track};
use core_runtime::events::{AlertEvent, CoreEvent, PlaybackEvent, QueueEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::command::{Command, Envelope, LoadOrigin, Message};
use super::Orchestrator;
use crate::error::{PlaybackError, Result};
use crate::model::PlayMode;
use crate::persistence::{QueueSnapshot, SCHEMA_VERSION};
use crate::retry::{AbnormalStopGuard, RetryDecision};
use crate::session::SessionToken;
use crate::state::PlayerState;

pub(super) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Orchestrator {
    // ========================================================================
    // Run Loop
    // ========================================================================

    pub(super) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Envelope>,
        mut internal: mpsc::UnboundedReceiver<Message>,
        shutdown: CancellationToken,
    ) {
        self.restore().await;
        self.publish();

        let mut position_poll = tokio::time::interval(self.config.position_poll_interval());
        position_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Player orchestrator started");
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Player orchestrator cancelled");
                    break;
                }

                envelope = commands.recv() => {
                    let Some(Envelope { command, reply }) = envelope else {
                        debug!("All player handles dropped");
                        break;
                    };
                    let stop = matches!(command, Command::Shutdown);
                    let result = self.dispatch(command).await;
                    self.publish();
                    let _ = reply.send(result);
                    if stop {
                        break;
                    }
                }

                Some(message) = internal.recv() => {
                    self.handle_message(message).await;
                    self.publish();
                }

                _ = position_poll.tick() => {
                    self.refresh_position();
                    self.publish();
                }
            }
        }
        info!("Player orchestrator stopped");
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        debug!(?command, "Handling command");
        match command {
            Command::Play { track, context } => self.play(track, context).await,
            Command::PlaySingle(track) => self.play_single(track).await,
            Command::PlayNext(track) => self.play_next(track).await,
            Command::AddToQueue(track) => self.add_to_queue(track).await,
            Command::AppendContext(tracks) => self.append_context(tracks).await,
            Command::PlayFm { track, context } => self.play_fm(track, context).await,
            Command::PrepareFm { track, context } => self.prepare_fm(track, context).await,
            Command::PlayPodcast {
                track,
                context,
                radio_id,
            } => self.play_podcast(track, context, radio_id).await,
            Command::PlayFromQueue(track) => self.play_from_queue(track).await,
            Command::RemoveFromUpcoming(offset) => self.remove_from_upcoming(offset).await,
            Command::MoveUpcoming { from, to } => self.move_upcoming(from, to).await,
            Command::ClearUpcoming => self.clear_upcoming().await,
            Command::ClearUserQueue => self.clear_user_queue().await,
            Command::RemoveFromUserQueue(index) => self.remove_from_user_queue(index).await,
            Command::Next => self.next().await,
            Command::Previous => self.previous().await,
            Command::SwitchMode => self.switch_mode().await,
            Command::SwitchQuality(quality) => self.switch_quality(quality).await,
            Command::Seek(position) => self.seek_to(position),
            Command::SeekForward(step) => self.seek_to(self.displayed_time() + step),
            Command::SeekBackward(step) => {
                self.seek_to(self.displayed_time().saturating_sub(step))
            }
            Command::TogglePlayPause => self.toggle_play_pause().await,
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::StopAndClear => self.stop_and_clear().await,
            Command::SaveNow => self.save_now().await,
            Command::Shutdown => {
                info!("Shutting down player");
                if let Err(e) = self.save_now().await {
                    warn!(error = %e, "Final queue snapshot failed");
                }
                Ok(())
            }
        }
    }

    async fn handle_message(&mut self, message: Message) {
        match message {
            Message::Engine(event) => self.on_engine_event(event).await,
            Message::Resolved {
                token,
                track,
                origin,
                start_at,
                result,
            } => self.on_resolved(token, track, origin, start_at, result).await,
            Message::Preloaded { epoch, result } => self.on_preloaded(epoch, result).await,
            Message::QualityPoll { epoch, attempt } => self.on_quality_poll(epoch, attempt).await,
            Message::RetryDue { token } => self.on_retry_due(token).await,
            Message::SeekDue { generation, target } => {
                self.on_seek_due(generation, target).await
            }
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Start loading `track`, invalidating every earlier load.
    ///
    /// With `remember_previous`, the track being left is pushed onto the back
    /// stack.
    #[instrument(skip(self, track), fields(track = %track.key))]
    pub(super) async fn load(
        &mut self,
        track: Track,
        origin: LoadOrigin,
        start_at: Duration,
        remember_previous: bool,
    ) {
        self.interrupt_transition().await;
        self.seek.reset();
        self.seek_timer.cancel();
        self.retry_timer.cancel();

        let resuming_same =
            !start_at.is_zero() && self.now_playing.as_ref() == Some(&track);
        if let Some(previous) = self.now_playing.take() {
            if remember_previous && previous != track {
                self.back_stack.push(previous);
            }
        }

        let token = self.session.begin();
        if origin == LoadOrigin::Selection {
            self.retry.reset();
        }
        if start_at.is_zero() {
            self.abnormal.reset();
        }

        self.now_playing = Some(track.clone());
        self.is_loading = true;
        self.is_playing = false;
        self.loaded = false;
        self.current_time = start_at;
        if !resuming_same || self.duration.is_zero() {
            self.duration = track.duration.unwrap_or_default();
        }

        self.history.record(&track);
        self.emit(CoreEvent::Playback(PlaybackEvent::TrackChanged {
            track_id: track.key.to_string(),
            title: track.title.clone(),
            gapless: false,
        }));
        self.schedule_save();

        debug!(%token, quality = self.quality.label(), "Resolving source");
        let resolver = self.resolver.clone();
        let tx = self.internal_tx.clone();
        let quality = self.quality;
        tokio::spawn(async move {
            let result = resolver.resolve(&track, quality).await;
            let _ = tx.send(Message::Resolved {
                token,
                track,
                origin,
                start_at,
                result,
            });
        });
    }

    async fn on_resolved(
        &mut self,
        token: SessionToken,
        track: Track,
        origin: LoadOrigin,
        start_at: Duration,
        result: std::result::Result<PlayableSource, ResolveError>,
    ) {
        if !self.session.is_current(token) {
            debug!(%token, track = %track.key, "Discarding stale resolution");
            return;
        }

        let source = match result {
            Ok(source) => source,
            Err(e) => {
                self.on_load_failure(track, origin, e).await;
                return;
            }
        };

        if let Err(e) = self.engine.play(&source).await {
            self.on_load_failure(track, origin, ResolveError::Other(e.to_string()))
                .await;
            return;
        }
        if !start_at.is_zero() {
            if let Err(e) = self.engine.seek(start_at).await {
                warn!(error = %e, "Failed to restore playback position");
            }
        }

        if let Some(duration) = source.duration {
            self.duration = duration;
        }
        self.retry.record_success();
        self.retry_timer.cancel();
        self.is_loading = false;
        self.loaded = true;
        self.is_playing = true;

        info!(
            track = %track.key,
            quality = source.quality.label(),
            url = %core_runtime::logging::redact_url(&source.url),
            "Playback started"
        );
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            track_id: track.key.to_string(),
            title: track.title.clone(),
        }));
        self.prepare_successor();
    }

    async fn on_load_failure(&mut self, track: Track, origin: LoadOrigin, error: ResolveError) {
        self.is_loading = false;
        self.loaded = false;
        self.is_playing = false;
        warn!(track = %track.key, ?origin, error = %error, "Failed to load track");

        if origin == LoadOrigin::Selection {
            self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                track_id: Some(track.key.to_string()),
                message: error.to_string(),
                recoverable: false,
            }));
            return;
        }

        match self.retry.record_failure() {
            RetryDecision::RetryAfter(delay) => {
                debug!(delay_ms = millis(delay), "Skipping ahead after backoff");
                self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                    track_id: Some(track.key.to_string()),
                    message: error.to_string(),
                    recoverable: true,
                }));
                let token = self.session.current();
                let tx = self.internal_tx.clone();
                self.retry_timer.schedule_after(delay, async move {
                    let _ = tx.send(Message::RetryDue { token });
                });
            }
            RetryDecision::GiveUp { failures } => {
                self.report_failure(&error, failures).await;
            }
        }
    }

    async fn report_failure(&mut self, error: &ResolveError, failures: u32) {
        let unavailable = error.is_unavailable();
        let (kind, title, message) = if unavailable {
            (
                AlertKind::Unavailable,
                "Content unavailable",
                format!("{failures} tracks in a row have no licensed source. Playback stopped."),
            )
        } else {
            (
                AlertKind::PlaybackFailure,
                "Playback failed",
                format!(
                    "{failures} tracks in a row failed to play ({}). Playback stopped.",
                    error.message()
                ),
            )
        };
        error!(failures, unavailable, "Giving up after consecutive failures");

        if let Err(e) = self
            .notifier
            .notify(Alert::new(kind, title, message.clone()))
            .await
        {
            warn!(error = %e, "Failed to deliver failure alert");
        }
        self.emit(CoreEvent::Alert(AlertEvent::FailureAlert {
            title: title.to_string(),
            message,
            unavailable,
        }));
    }

    async fn on_retry_due(&mut self, token: SessionToken) {
        if !self.session.is_current(token) {
            debug!(%token, "Discarding stale retry");
            return;
        }
        self.advance(LoadOrigin::Advance).await;
    }

    /// Move to the successor, or stop when there is none.
    pub(super) async fn advance(&mut self, origin: LoadOrigin) {
        match self.queue.advance() {
            Some(next) => self.load(next, origin, Duration::ZERO, true).await,
            None => {
                debug!("Queue exhausted");
                self.halt().await;
            }
        }
    }

    /// Stop the engine but keep the queue.
    async fn halt(&mut self) {
        self.interrupt_transition().await;
        self.session.begin();
        if let Err(e) = self.engine.stop().await {
            warn!(error = %e, "Failed to stop engine");
        }
        self.is_playing = false;
        self.is_loading = false;
        self.loaded = false;
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped {
            track_id: self.now_playing.as_ref().map(|t| t.key.to_string()),
        }));
    }

    // ========================================================================
    // Engine Callbacks
    // ========================================================================

    async fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Started => {
                if self.loaded {
                    self.is_loading = false;
                }
            }
            EngineEvent::NextPrepared => self.on_next_prepared().await,
            EngineEvent::Finished => self.on_finished().await,
            EngineEvent::DurationKnown(duration) => self.duration = duration,
            EngineEvent::Failed(message) => {
                if !self.loaded || self.is_loading {
                    debug!(%message, "Ignoring engine failure for a superseded source");
                    return;
                }
                let Some(track) = self.now_playing.clone() else {
                    return;
                };
                self.interrupt_transition().await;
                self.on_load_failure(track, LoadOrigin::Advance, ResolveError::Other(message))
                    .await;
            }
        }
    }

    async fn on_finished(&mut self) {
        if self.is_loading || !self.loaded {
            debug!("Ignoring finish signal while nothing is playing");
            return;
        }
        let Some(track) = self.now_playing.clone() else {
            return;
        };
        let played = self.current_time.max(self.engine.current_time());
        self.emit(CoreEvent::Playback(PlaybackEvent::Completed {
            track_id: track.key.to_string(),
        }));

        if self.config.abnormal_stop_recovery
            && AbnormalStopGuard::is_abnormal(played, self.duration)
        {
            if self.abnormal.try_reload() {
                warn!(
                    track = %track.key,
                    played_ms = millis(played),
                    duration_ms = millis(self.duration),
                    attempt = self.abnormal.attempts(),
                    "Track stopped early; reloading"
                );
                self.load(track, LoadOrigin::Advance, played, false).await;
                return;
            }
            warn!(track = %track.key, "Track keeps stopping early; moving on");
        }
        self.abnormal.reset();

        if self.queue.mode() == PlayMode::RepeatOne {
            self.load(track, LoadOrigin::Advance, Duration::ZERO, false)
                .await;
            return;
        }
        if self.try_commit_next().await {
            return;
        }
        self.advance(LoadOrigin::Advance).await;
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub(super) async fn toggle_play_pause(&mut self) -> Result<()> {
        if self.is_playing {
            self.pause().await
        } else {
            self.resume().await
        }
    }

    pub(super) async fn pause(&mut self) -> Result<()> {
        if !self.loaded || !self.is_playing {
            return Ok(());
        }
        self.engine.pause().await?;
        self.is_playing = false;
        self.refresh_position();
        self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
            track_id: self.current_track_id(),
            position_ms: millis(self.current_time),
        }));
        Ok(())
    }

    pub(super) async fn resume(&mut self) -> Result<()> {
        if self.is_playing || self.is_loading {
            return Ok(());
        }
        if self.loaded {
            self.engine.resume().await?;
            self.is_playing = true;
            self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
                track_id: self.current_track_id(),
                position_ms: millis(self.current_time),
            }));
            return Ok(());
        }
        let track = self
            .now_playing
            .clone()
            .or_else(|| self.queue.current().cloned())
            .ok_or(PlaybackError::NoTrackLoaded)?;
        self.load(track, LoadOrigin::Selection, Duration::ZERO, false)
            .await;
        Ok(())
    }

    pub(super) async fn stop_and_clear(&mut self) -> Result<()> {
        self.interrupt_transition().await;
        self.session.begin();
        self.retry_timer.cancel();
        self.seek.reset();
        self.seek_timer.cancel();
        self.retry.reset();
        if let Err(e) = self.engine.stop().await {
            warn!(error = %e, "Failed to stop engine");
        }

        let track_id = self.now_playing.take().map(|t| t.key.to_string());
        self.queue.clear();
        self.back_stack.clear();
        self.is_playing = false;
        self.is_loading = false;
        self.loaded = false;
        self.current_time = Duration::ZERO;
        self.duration = Duration::ZERO;

        info!("Playback stopped and queue cleared");
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped { track_id }));
        self.queue_changed();
        Ok(())
    }

    // ========================================================================
    // Seeking
    // ========================================================================

    /// Show `position` immediately and send it to the engine once the burst
    /// of seek requests settles.
    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if !self.loaded {
            debug!("Ignoring seek with nothing loaded");
            return Ok(());
        }
        let target = if self.duration.is_zero() {
            position
        } else {
            position.min(self.duration)
        };
        let generation = self.seek.request(target, Instant::now());
        self.current_time = target;

        let tx = self.internal_tx.clone();
        self.seek_timer
            .schedule_after(self.config.seek_debounce(), async move {
                let _ = tx.send(Message::SeekDue { generation, target });
            });
        Ok(())
    }

    async fn on_seek_due(&mut self, generation: u64, target: Duration) {
        if !self.seek.is_latest(generation) || !self.loaded {
            return;
        }
        debug!(target_ms = millis(target), "Seeking");
        if let Err(e) = self.engine.seek(target).await {
            warn!(error = %e, "Engine seek failed");
            self.seek.reset();
            return;
        }
        self.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
            track_id: self.current_track_id(),
            position_ms: millis(target),
            duration_ms: millis(self.duration),
        }));
    }

    /// Mirror the engine position unless a seek is waiting for confirmation.
    fn refresh_position(&mut self) {
        if !self.loaded {
            return;
        }
        let engine_time = self.engine.current_time();
        if self.seek.observe(engine_time, Instant::now()) {
            return;
        }
        self.current_time = engine_time;
    }

    fn displayed_time(&self) -> Duration {
        self.seek.target().unwrap_or(self.current_time)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    async fn restore(&mut self) {
        let Some(snapshot) = self.persistence.restore().await else {
            return;
        };
        self.queue.restore(&snapshot);
        self.history.replace(snapshot.history.clone());
        self.back_stack.replace(snapshot.back_stack.clone());
        if let Some(quality) = snapshot.quality {
            self.quality = quality;
        }
        self.now_playing = self.queue.current().cloned();
        self.duration = self
            .now_playing
            .as_ref()
            .and_then(|t| t.duration)
            .unwrap_or_default();

        let tracks = self.queue.context().len();
        info!(tracks, mode = %self.queue.mode(), "Restored queue");
        self.emit(CoreEvent::Queue(QueueEvent::Restored { tracks }));
    }

    fn queue_snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            schema_version: SCHEMA_VERSION,
            current_track: self
                .now_playing
                .clone()
                .or_else(|| self.queue.current().cloned()),
            context: self.queue.context().to_vec(),
            shuffled_context: self.queue.shuffled_context().to_vec(),
            position: self.queue.position(),
            user_queue: self.queue.user_queue().to_vec(),
            mode: self.queue.mode(),
            play_source: self.queue.play_source().clone(),
            history: self.history.to_vec(),
            back_stack: self.back_stack.to_vec(),
            quality: Some(self.quality),
            saved_at: Some(self.clock.now()),
        }
    }

    pub(super) fn schedule_save(&mut self) {
        let snapshot = self.queue_snapshot();
        self.persistence.schedule(snapshot);
    }

    async fn save_now(&mut self) -> Result<()> {
        let snapshot = self.queue_snapshot();
        self.persistence.save_now(snapshot).await
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    pub(super) fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error.
        let _ = self.events.emit(event);
    }

    pub(super) fn current_track_id(&self) -> String {
        self.now_playing
            .as_ref()
            .map(|t| t.key.to_string())
            .unwrap_or_default()
    }

    /// Emit a queue change and schedule a snapshot write.
    pub(super) fn queue_changed(&mut self) {
        self.emit(CoreEvent::Queue(QueueEvent::Changed {
            upcoming: self.queue.upcoming().len(),
            context_len: self.queue.context().len(),
        }));
        self.schedule_save();
    }

    fn publish(&mut self) {
        let state = PlayerState {
            current_track: self
                .now_playing
                .clone()
                .or_else(|| self.queue.current().cloned()),
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            current_time: self.displayed_time(),
            duration: self.duration,
            is_seeking: self.seek.is_seeking(),
            upcoming: self.queue.upcoming(),
            user_queue_len: self.queue.user_queue().len(),
            context_len: self.queue.context().len(),
            position: self.queue.position(),
            mode: self.queue.mode(),
            play_source: self.queue.play_source().clone(),
            quality: self.quality,
            history: self.history.to_vec(),
            can_go_back: !self.back_stack.is_empty() || self.queue.context().len() > 1,
            transition: self.transition.phase(),
        };
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}
