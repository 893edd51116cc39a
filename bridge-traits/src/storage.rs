//! Persistence bridge.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::Result;

/// Byte-oriented key-value store used for persisted player state.
///
/// Abstracts platform-specific storage:
/// - iOS: file cache or UserDefaults
/// - Android: DataStore
/// - Desktop: SQLite (see `bridge-desktop`)
///
/// Entries written with a TTL must read back as missing once it elapses.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
/// use bytes::Bytes;
///
/// async fn remember(store: &dyn KeyValueStore) -> bridge_traits::error::Result<()> {
///     store.set("player.queue.v3", Bytes::from_static(b"{}"), None).await?;
///     let value = store.get("player.queue.v3").await?;
///     assert!(value.is_some());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, returning `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists without reading it.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
