//! Gapless preparation and in-place quality switches.
//!
//! Both use the engine's secondary slot: a source is resolved off-task,
//! handed to [`AudioEngine::prepare_next`](bridge_traits::AudioEngine::prepare_next)
//! and committed once the engine reports it buffered. Quality switches also
//! poll [`AudioEngine::is_next_prepared`](bridge_traits::AudioEngine::is_next_prepared)
//! and fall back to a plain reload when the buffer never becomes ready.

use bridge_traits::{PlayableSource, Quality, ResolveError, Track};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::actor::millis;
use super::command::{LoadOrigin, Message};
use super::Orchestrator;
use crate::error::Result;
use crate::model::PlayMode;
use crate::session::SessionToken;
use crate::transition::{TransitionPhase, TransitionPurpose};

impl Orchestrator {
    // ========================================================================
    // Gapless Next Track
    // ========================================================================

    /// Start buffering the successor when nothing else occupies the slot.
    pub(super) fn prepare_successor(&mut self) {
        if !self.config.gapless
            || !self.loaded
            || self.is_loading
            || self.queue.mode() == PlayMode::RepeatOne
            || self.transition.phase() != TransitionPhase::Idle
        {
            return;
        }
        let Some(next) = self.queue.successor() else {
            return;
        };
        if self.now_playing.as_ref() == Some(&next) {
            return;
        }
        let epoch = self
            .transition
            .begin(next.clone(), TransitionPurpose::NextTrack);
        debug!(track = %next.key, %epoch, "Preparing successor");
        self.spawn_preload(next, self.quality, epoch);
    }

    fn spawn_preload(&self, track: Track, quality: Quality, epoch: SessionToken) {
        let resolver = self.resolver.clone();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&track, quality).await;
            let _ = tx.send(Message::Preloaded { epoch, result });
        });
    }

    pub(super) async fn on_preloaded(
        &mut self,
        epoch: SessionToken,
        result: std::result::Result<PlayableSource, ResolveError>,
    ) {
        if !self.transition.is_preparing(epoch) {
            debug!(%epoch, "Discarding stale preparation");
            return;
        }
        let source = match result {
            Ok(source) => source,
            Err(e) => {
                self.abandon_transition(e.to_string());
                return;
            }
        };
        if let Err(e) = self.engine.prepare_next(&source).await {
            self.abandon_transition(e.to_string());
            return;
        }
        self.transition.mark_handed_off(epoch);
    }

    fn abandon_transition(&mut self, reason: String) {
        let purpose = self.transition.pending().map(|p| p.purpose.clone());
        self.transition.reset();
        self.quality_poll.cancel();
        match purpose {
            Some(TransitionPurpose::QualitySwitch { quality, .. }) => {
                warn!(quality = quality.label(), %reason, "Quality switch failed");
                self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                    track_id: self.now_playing.as_ref().map(|t| t.key.to_string()),
                    message: format!("Quality switch to {} failed: {reason}", quality.label()),
                    recoverable: true,
                }));
                self.prepare_successor();
            }
            Some(TransitionPurpose::NextTrack) => {
                debug!(%reason, "Successor preparation failed; will load on finish");
            }
            None => {}
        }
    }

    pub(super) async fn on_next_prepared(&mut self) {
        let Some(purpose) = self.transition.mark_prepared().map(|p| p.purpose.clone()) else {
            debug!("Ignoring unexpected readiness signal");
            return;
        };
        match purpose {
            TransitionPurpose::QualitySwitch { .. } => self.commit_quality_switch().await,
            TransitionPurpose::NextTrack => debug!("Successor buffered"),
        }
    }

    /// Swap to the buffered successor. Returns `false` when no matching
    /// successor is ready and the caller should load normally.
    pub(super) async fn try_commit_next(&mut self) -> bool {
        let successor = self.queue.successor();
        let ready = self.transition.phase() == TransitionPhase::Prepared
            && self.transition.pending().is_some_and(|p| {
                p.purpose == TransitionPurpose::NextTrack && successor.as_ref() == Some(&p.track)
            });
        if !ready {
            return false;
        }
        let Some(pending) = self.transition.begin_commit() else {
            return false;
        };
        if let Err(e) = self.engine.commit_to_prepared(None).await {
            warn!(error = %e, "Gapless commit failed");
            self.transition.finish_commit();
            return false;
        }

        let track = pending.track;
        if self.queue.advance().as_ref() != Some(&track) {
            self.queue.focus(&track);
        }
        if let Some(previous) = self.now_playing.take() {
            if previous != track {
                self.back_stack.push(previous);
            }
        }
        self.session.begin();
        self.seek.reset();
        self.seek_timer.cancel();
        self.retry_timer.cancel();

        self.now_playing = Some(track.clone());
        self.current_time = Duration::ZERO;
        self.duration = track.duration.unwrap_or_default();
        self.is_loading = false;
        self.loaded = true;
        self.is_playing = true;
        self.retry.record_success();
        self.abnormal.reset();
        self.history.record(&track);

        info!(track = %track.key, "Gapless transition");
        self.emit(CoreEvent::Playback(PlaybackEvent::TrackChanged {
            track_id: track.key.to_string(),
            title: track.title.clone(),
            gapless: true,
        }));
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            track_id: track.key.to_string(),
            title: track.title.clone(),
        }));

        self.transition.finish_commit();
        self.queue_changed();
        self.prepare_successor();
        true
    }

    // ========================================================================
    // Quality Switch
    // ========================================================================

    pub(super) async fn switch_quality(&mut self, quality: Quality) -> Result<()> {
        if quality == self.quality {
            let switching = self
                .transition
                .pending()
                .is_some_and(|p| matches!(p.purpose, TransitionPurpose::QualitySwitch { .. }));
            if switching {
                debug!("Quality switch withdrawn");
                self.interrupt_transition().await;
                self.prepare_successor();
            }
            return Ok(());
        }

        let track = match self.now_playing.clone() {
            Some(track) if self.loaded && !self.is_loading => track,
            _ => {
                self.quality = quality;
                if let Some(track) = &self.now_playing {
                    self.emit(CoreEvent::Playback(PlaybackEvent::QualityChanged {
                        track_id: track.key.to_string(),
                        quality: quality.label().to_string(),
                    }));
                }
                self.schedule_save();
                return Ok(());
            }
        };

        let resume_at = self
            .seek
            .target()
            .unwrap_or_else(|| self.engine.current_time());
        self.interrupt_transition().await;
        let epoch = self.transition.begin(
            track.clone(),
            TransitionPurpose::QualitySwitch { quality, resume_at },
        );
        info!(
            track = %track.key,
            from = self.quality.label(),
            to = quality.label(),
            resume_ms = millis(resume_at),
            "Switching quality"
        );
        self.spawn_preload(track, quality, epoch);
        self.start_quality_poll(epoch);
        Ok(())
    }

    fn start_quality_poll(&mut self, epoch: SessionToken) {
        let tx = self.internal_tx.clone();
        let interval = self.config.quality_poll_interval();
        let attempts = self.config.quality_poll_attempts;
        self.quality_poll.spawn(async move {
            for attempt in 1..=attempts {
                tokio::time::sleep(interval).await;
                if tx.send(Message::QualityPoll { epoch, attempt }).is_err() {
                    break;
                }
            }
        });
    }

    pub(super) async fn on_quality_poll(&mut self, epoch: SessionToken, attempt: u32) {
        if !self.transition.is_current(epoch) {
            return;
        }
        let handed_off = self.transition.pending().is_some_and(|p| p.handed_off);
        if self.transition.is_preparing(epoch) && handed_off && self.engine.is_next_prepared() {
            if self.transition.mark_prepared().is_some() {
                self.commit_quality_switch().await;
            }
            return;
        }
        if attempt < self.config.quality_poll_attempts {
            return;
        }
        let Some(pending) = self.transition.pending().cloned() else {
            return;
        };
        if let TransitionPurpose::QualitySwitch { quality, resume_at } = pending.purpose {
            warn!(
                track = %pending.track.key,
                attempts = attempt,
                "Secondary buffer never became ready; reloading"
            );
            self.reload_at(pending.track, quality, resume_at).await;
        }
    }

    async fn commit_quality_switch(&mut self) {
        let Some(pending) = self.transition.begin_commit() else {
            return;
        };
        let TransitionPurpose::QualitySwitch { quality, resume_at } = pending.purpose else {
            self.transition.finish_commit();
            return;
        };
        self.quality_poll.cancel();

        if let Err(e) = self.engine.commit_to_prepared(Some(resume_at)).await {
            warn!(error = %e, "Quality commit failed; reloading");
            self.transition.finish_commit();
            self.reload_at(pending.track, quality, resume_at).await;
            return;
        }

        self.transition.finish_commit();
        self.quality = quality;
        self.seek.reset();
        self.current_time = resume_at;
        info!(track = %pending.track.key, quality = quality.label(), "Quality switched");
        self.emit(CoreEvent::Playback(PlaybackEvent::QualityChanged {
            track_id: pending.track.key.to_string(),
            quality: quality.label().to_string(),
        }));
        self.schedule_save();
        self.prepare_successor();
    }

    /// Restart `track` at `quality` from `resume_at` with a regular load.
    async fn reload_at(&mut self, track: Track, quality: Quality, resume_at: Duration) {
        self.interrupt_transition().await;
        if let Err(e) = self.engine.stop().await {
            warn!(error = %e, "Failed to stop engine before reload");
        }
        self.quality = quality;
        self.emit(CoreEvent::Playback(PlaybackEvent::QualityChanged {
            track_id: track.key.to_string(),
            quality: quality.label().to_string(),
        }));
        self.load(track, LoadOrigin::Selection, resume_at, false)
            .await;
    }

    // ========================================================================
    // Interruption
    // ========================================================================

    /// Drop any pending transition and release the engine's secondary slot.
    pub(super) async fn interrupt_transition(&mut self) {
        self.quality_poll.cancel();
        if self.transition.reset() {
            if let Err(e) = self.engine.cancel_next_preparation().await {
                warn!(error = %e, "Failed to cancel secondary preparation");
            }
        }
    }

    /// Re-aim a gapless preparation after the queue changed.
    pub(super) async fn retarget_preparation(&mut self) {
        let pending = self
            .transition
            .pending()
            .map(|p| (p.purpose == TransitionPurpose::NextTrack, p.track.clone()));
        match pending {
            Some((true, track)) => {
                let stale = self.queue.mode() == PlayMode::RepeatOne
                    || self.queue.successor().as_ref() != Some(&track);
                if stale {
                    debug!(track = %track.key, "Successor changed; re-preparing");
                    self.interrupt_transition().await;
                    self.prepare_successor();
                }
            }
            Some((false, _)) => {}
            None => self.prepare_successor(),
        }
    }
}
