//! # Playback Error Types
//!
//! Errors surfaced by the player handle and its internal components.

use bridge_traits::{BridgeError, ResolveError};
use thiserror::Error;

/// Errors that can occur during playback and queue operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The source resolver could not produce a playable stream.
    #[error("Source resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The audio engine rejected a command.
    #[error("Audio engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// An upcoming-list offset did not address an entry.
    #[error("Invalid upcoming index: {0}")]
    InvalidIndex(usize),

    /// A queue edit that would leave the queue inconsistent.
    #[error("Invalid queue operation: {0}")]
    InvalidQueueOperation(String),

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The key-value store failed to read or write the snapshot.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Snapshot JSON could not be encoded or decoded.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Configuration failed validation.
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    /// The orchestrator task has stopped and no longer accepts commands.
    #[error("Player has shut down")]
    PlayerShutDown,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::Resolution(ResolveError::Network(_))
                | PlaybackError::Persistence(_)
                | PlaybackError::Engine(BridgeError::OperationFailed(_))
        )
    }

    /// Returns `true` if the catalog reported the content as unavailable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PlaybackError::Resolution(e) if e.is_unavailable())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_resolution_failures() {
        let unavailable = PlaybackError::from(ResolveError::Unavailable("vip".into()));
        assert!(unavailable.is_unavailable());
        assert!(!unavailable.is_transient());

        let network = PlaybackError::from(ResolveError::Network("timeout".into()));
        assert!(network.is_transient());
        assert!(!network.is_unavailable());
    }

    #[test]
    fn display_includes_context() {
        let err = PlaybackError::InvalidIndex(7);
        assert_eq!(err.to_string(), "Invalid upcoming index: 7");
    }
}
