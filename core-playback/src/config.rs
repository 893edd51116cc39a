//! # Playback Configuration
//!
//! Tunables for the orchestrator: retry limits, debounce windows, history
//! caps and the transition polling budget.

use bridge_traits::Quality;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator configuration.
///
/// All durations are stored as milliseconds so the struct serializes cleanly
/// into host settings files; use the accessor methods to get [`Duration`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Consecutive auto-advance failures tolerated before giving up.
    ///
    /// Default: 3.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Delay before the first skip after a failure.
    ///
    /// Default: 1000 ms, doubling per failure.
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    /// Upper bound for the skip delay.
    ///
    /// Default: 10000 ms.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Quiet window before a seek reaches the engine.
    ///
    /// Default: 50 ms.
    #[serde(default = "default_seek_debounce_ms")]
    pub seek_debounce_ms: u64,

    /// Engine positions within this distance of a seek target confirm it.
    ///
    /// Default: 1000 ms.
    #[serde(default = "default_seek_tolerance_ms")]
    pub seek_tolerance_ms: u64,

    /// A seek target is dropped after this long even without confirmation.
    ///
    /// Default: 3000 ms.
    #[serde(default = "default_seek_confirm_timeout_ms")]
    pub seek_confirm_timeout_ms: u64,

    /// Quiet window before a queue snapshot is written.
    ///
    /// Default: 2000 ms.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Interval between readiness checks during a quality switch.
    ///
    /// Default: 50 ms.
    #[serde(default = "default_quality_poll_interval_ms")]
    pub quality_poll_interval_ms: u64,

    /// Readiness checks before a quality switch falls back to a full reload.
    ///
    /// Default: 200 (10 seconds at the default interval).
    #[serde(default = "default_quality_poll_attempts")]
    pub quality_poll_attempts: u32,

    /// Interval at which the displayed position is refreshed from the engine.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_position_poll_interval_ms")]
    pub position_poll_interval_ms: u64,

    /// Maximum entries in the play history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Maximum persisted context length.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,

    /// Maximum depth of the "previous" back stack.
    #[serde(default = "default_back_stack_limit")]
    pub back_stack_limit: usize,

    /// Optional expiry for persisted snapshots.
    #[serde(default)]
    pub snapshot_ttl_secs: Option<u64>,

    /// Capacity of the command channel feeding the orchestrator.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Reloads attempted for a track that keeps stopping early.
    ///
    /// Default: 3.
    #[serde(default = "default_abnormal_stop_limit")]
    pub abnormal_stop_limit: u32,

    /// Quality used until the listener picks another one.
    #[serde(default)]
    pub initial_quality: Quality,

    /// Pre-buffer the successor for gapless transitions.
    #[serde(default = "default_true")]
    pub gapless: bool,

    /// Persist and restore the queue.
    #[serde(default = "default_true")]
    pub persistence: bool,

    /// Reload tracks that stop well before their end.
    #[serde(default = "default_true")]
    pub abnormal_stop_recovery: bool,
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    1_000
}

fn default_max_retry_delay_ms() -> u64 {
    10_000
}

fn default_seek_debounce_ms() -> u64 {
    50
}

fn default_seek_tolerance_ms() -> u64 {
    1_000
}

fn default_seek_confirm_timeout_ms() -> u64 {
    3_000
}

fn default_save_debounce_ms() -> u64 {
    2_000
}

fn default_quality_poll_interval_ms() -> u64 {
    50
}

fn default_quality_poll_attempts() -> u32 {
    200
}

fn default_position_poll_interval_ms() -> u64 {
    500
}

fn default_history_limit() -> usize {
    50
}

fn default_context_limit() -> usize {
    200
}

fn default_back_stack_limit() -> usize {
    200
}

fn default_command_buffer() -> usize {
    64
}

fn default_abnormal_stop_limit() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            seek_debounce_ms: default_seek_debounce_ms(),
            seek_tolerance_ms: default_seek_tolerance_ms(),
            seek_confirm_timeout_ms: default_seek_confirm_timeout_ms(),
            save_debounce_ms: default_save_debounce_ms(),
            quality_poll_interval_ms: default_quality_poll_interval_ms(),
            quality_poll_attempts: default_quality_poll_attempts(),
            position_poll_interval_ms: default_position_poll_interval_ms(),
            history_limit: default_history_limit(),
            context_limit: default_context_limit(),
            back_stack_limit: default_back_stack_limit(),
            snapshot_ttl_secs: None,
            command_buffer: default_command_buffer(),
            abnormal_stop_limit: default_abnormal_stop_limit(),
            initial_quality: Quality::default(),
            gapless: default_true(),
            persistence: default_true(),
            abnormal_stop_recovery: default_true(),
        }
    }
}

impl PlaybackConfig {
    /// Configuration that never touches the key-value store.
    ///
    /// Useful for previews and for hosts that manage their own queue state.
    pub fn ephemeral() -> Self {
        Self {
            persistence: false,
            ..Default::default()
        }
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn seek_debounce(&self) -> Duration {
        Duration::from_millis(self.seek_debounce_ms)
    }

    pub fn seek_tolerance(&self) -> Duration {
        Duration::from_millis(self.seek_tolerance_ms)
    }

    pub fn seek_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_confirm_timeout_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn quality_poll_interval(&self) -> Duration {
        Duration::from_millis(self.quality_poll_interval_ms)
    }

    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }

    pub fn snapshot_ttl(&self) -> Option<Duration> {
        self.snapshot_ttl_secs.map(Duration::from_secs)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_consecutive_failures == 0 {
            return Err("max_consecutive_failures must be > 0".to_string());
        }

        if self.initial_retry_delay_ms > self.max_retry_delay_ms {
            return Err("initial_retry_delay_ms cannot exceed max_retry_delay_ms".to_string());
        }

        if self.seek_debounce_ms == 0 || self.save_debounce_ms == 0 {
            return Err("debounce windows must be > 0".to_string());
        }

        if self.quality_poll_interval_ms == 0 || self.quality_poll_attempts == 0 {
            return Err("quality polling needs a non-zero interval and attempt budget".to_string());
        }

        if self.position_poll_interval_ms == 0 {
            return Err("position_poll_interval_ms must be > 0".to_string());
        }

        if self.history_limit == 0 || self.context_limit == 0 || self.back_stack_limit == 0 {
            return Err("history, context and back stack limits must be > 0".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }
}
