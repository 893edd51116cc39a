//! # Playback Session & Queue Orchestration
//!
//! Owns the listening session of the player: what is playing, what comes
//! next and how the two are kept in step with the host audio engine.
//!
//! ## Overview
//!
//! This module handles:
//! - The queue model: context list, shuffled permutation and user queue
//! - Loading tracks through the host [`SourceResolver`](bridge_traits::SourceResolver)
//! - Gapless preloading of the successor and in-place quality switches
//! - Skip-ahead on failure with exponential backoff and a failure alert
//! - Debounced seeking and debounced queue snapshots
//!
//! Everything is driven through a [`PlayerHandle`]; see [`player`] for the
//! task layout.

pub mod config;
pub mod debounce;
pub mod error;
pub mod history;
pub mod model;
pub mod persistence;
pub mod player;
pub mod queue;
pub mod retry;
pub mod seek;
pub mod session;
pub mod state;
pub mod transition;

pub use config::PlaybackConfig;
pub use error::{PlaybackError, Result};
pub use history::{BackStack, PlayHistory};
pub use model::{PlayMode, PlaySource};
pub use persistence::{PersistenceGateway, QueueSnapshot, SnapshotLimits};
pub use player::{EngineEventSender, LoadOrigin, Player, PlayerDependencies, PlayerHandle};
pub use queue::QueueModel;
pub use retry::{AbnormalStopGuard, RetryDecision, RetryPolicy};
pub use state::PlayerState;
pub use transition::{TransitionPhase, TransitionPurpose};
