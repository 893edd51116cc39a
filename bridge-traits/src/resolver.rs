//! Source resolution bridge.
//!
//! Turns a catalog [`Track`] plus a requested [`Quality`] into a directly
//! playable stream. Implementations usually call a catalog HTTP API; the core
//! only cares whether the call succeeded and, on failure, which class of
//! failure occurred.

use async_trait::async_trait;
use thiserror::Error;

use crate::media::{PlayableSource, Quality, Track};

/// Classified resolution failure.
///
/// The split between [`ResolveError::Unavailable`] and the other variants
/// drives the wording of user-facing failure alerts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The catalog has no licensed stream for this track.
    #[error("No licensed source available: {0}")]
    Unavailable(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Source resolution failed: {0}")]
    Other(String),
}

impl ResolveError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ResolveError::Unavailable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ResolveError::Unavailable(m) | ResolveError::Network(m) | ResolveError::Other(m) => m,
        }
    }
}

/// Resolves tracks to playable sources.
///
/// Each call is an independent request; the core may issue a new call before
/// an older one completes and will discard stale results itself, so
/// implementations need not support cancellation.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::resolver::{ResolveError, SourceResolver};
/// use bridge_traits::media::{PlayableSource, Quality, Track};
///
/// struct CatalogResolver { /* http client */ }
///
/// #[async_trait::async_trait]
/// impl SourceResolver for CatalogResolver {
///     async fn resolve(&self, track: &Track, quality: Quality)
///         -> Result<PlayableSource, ResolveError>
///     {
///         let url = format!("https://cdn.example.com/{}.flac", track.key.id);
///         Ok(PlayableSource::new(url, quality))
///     }
/// }
/// ```
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Resolve a stream URL for `track` at `quality`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unavailable`] when the catalog reports no
    /// playable rights, [`ResolveError::Network`] for transport failures and
    /// [`ResolveError::Other`] for everything else.
    async fn resolve(&self, track: &Track, quality: Quality)
        -> Result<PlayableSource, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ResolveError::Unavailable("vip only".into()).is_unavailable());
        assert!(!ResolveError::Network("timeout".into()).is_unavailable());
        assert_eq!(ResolveError::Other("boom".into()).message(), "boom");
    }
}
