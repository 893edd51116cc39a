//! Queue-editing and navigation commands.

use bridge_traits::Track;
use core_runtime::events::{CoreEvent, QueueEvent};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::command::LoadOrigin;
use super::Orchestrator;
use crate::error::{PlaybackError, Result};
use crate::model::PlaySource;

impl Orchestrator {
    // ========================================================================
    // Starting Playback
    // ========================================================================

    pub(super) async fn play(&mut self, track: Track, context: Vec<Track>) -> Result<()> {
        if self.now_playing.as_ref() == Some(&track) {
            return self.toggle_play_pause().await;
        }
        let replace = self.queue.is_empty() || *self.queue.play_source() != PlaySource::Normal;
        self.queue.set_play_source(PlaySource::Normal);
        if replace {
            self.queue.set_context(context, Some(&track));
        } else {
            self.queue.insert_after_current(context, &track);
        }
        self.start(track).await;
        Ok(())
    }

    pub(super) async fn play_single(&mut self, track: Track) -> Result<()> {
        self.queue.set_play_source(PlaySource::Normal);
        self.queue.set_context(vec![track.clone()], Some(&track));
        self.start(track).await;
        Ok(())
    }

    pub(super) async fn play_fm(&mut self, track: Track, context: Vec<Track>) -> Result<()> {
        self.queue.set_play_source(PlaySource::Fm);
        self.queue.set_context(context, Some(&track));
        info!(track = %track.key, "Starting personal radio");
        self.start(track).await;
        Ok(())
    }

    /// Seed personal radio so the next resume starts it, without loading.
    pub(super) async fn prepare_fm(&mut self, track: Track, context: Vec<Track>) -> Result<()> {
        self.session.begin();
        self.interrupt_transition().await;
        self.retry_timer.cancel();
        self.seek_timer.cancel();
        self.seek.reset();
        if self.loaded || self.is_loading {
            if let Err(e) = self.engine.stop().await {
                warn!(error = %e, "Failed to stop engine");
            }
        }
        self.is_playing = false;
        self.is_loading = false;
        self.loaded = false;
        self.current_time = Duration::ZERO;
        self.duration = track.duration.unwrap_or_default();

        self.queue.set_play_source(PlaySource::Fm);
        self.queue.set_context(context, Some(&track));
        self.now_playing = Some(track);
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn play_podcast(
        &mut self,
        track: Track,
        context: Vec<Track>,
        radio_id: Option<String>,
    ) -> Result<()> {
        self.queue.set_play_source(PlaySource::Podcast { radio_id });
        self.queue.set_context(context, Some(&track));
        self.start(track).await;
        Ok(())
    }

    pub(super) async fn play_from_queue(&mut self, track: Track) -> Result<()> {
        if self.now_playing.as_ref() == Some(&track) {
            return self.toggle_play_pause().await;
        }
        self.queue.focus(&track);
        self.start(track).await;
        Ok(())
    }

    async fn start(&mut self, track: Track) {
        self.load(track, LoadOrigin::Selection, Duration::ZERO, true)
            .await;
        self.after_queue_edit().await;
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub(super) async fn next(&mut self) -> Result<()> {
        self.retry.reset();
        self.advance(LoadOrigin::Advance).await;
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn previous(&mut self) -> Result<()> {
        self.retry.reset();
        let target = match self.back_stack.pop() {
            Some(track) => {
                self.queue.focus(&track);
                Some(track)
            }
            None => self.queue.retreat(),
        };
        let Some(track) = target else {
            debug!("Nothing to go back to");
            return Ok(());
        };
        self.load(track, LoadOrigin::Advance, Duration::ZERO, false)
            .await;
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn switch_mode(&mut self) -> Result<()> {
        let mode = self.queue.switch_mode();
        info!(%mode, "Play mode changed");
        self.emit(CoreEvent::Queue(QueueEvent::ModeChanged {
            mode: mode.as_str().to_string(),
        }));
        self.after_queue_edit().await;
        Ok(())
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub(super) async fn append_context(&mut self, tracks: Vec<Track>) -> Result<()> {
        let added = self.queue.append_unique(tracks);
        debug!(added, "Appended to context");
        if added > 0 {
            self.after_queue_edit().await;
        }
        Ok(())
    }

    pub(super) async fn play_next(&mut self, track: Track) -> Result<()> {
        self.queue.play_next(track);
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn add_to_queue(&mut self, track: Track) -> Result<()> {
        if self.queue.add_to_queue(track) {
            self.after_queue_edit().await;
        }
        Ok(())
    }

    pub(super) async fn remove_from_upcoming(&mut self, offset: usize) -> Result<()> {
        self.queue
            .remove_upcoming(offset)
            .ok_or(PlaybackError::InvalidIndex(offset))?;
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn move_upcoming(&mut self, from: usize, to: usize) -> Result<()> {
        if !self.queue.move_upcoming(from, to) {
            return Err(PlaybackError::InvalidQueueOperation(format!(
                "cannot move upcoming entry {from} to {to}"
            )));
        }
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn clear_upcoming(&mut self) -> Result<()> {
        self.queue.clear_upcoming();
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn clear_user_queue(&mut self) -> Result<()> {
        self.queue.clear_user_queue();
        self.after_queue_edit().await;
        Ok(())
    }

    pub(super) async fn remove_from_user_queue(&mut self, index: usize) -> Result<()> {
        self.queue
            .remove_from_user_queue(index)
            .ok_or(PlaybackError::InvalidIndex(index))?;
        self.after_queue_edit().await;
        Ok(())
    }

    /// Re-aim any gapless preparation at the new successor, then announce the
    /// change.
    pub(super) async fn after_queue_edit(&mut self) {
        self.retarget_preparation().await;
        self.queue_changed();
    }
}
