//! Key-value storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use bytes::Bytes;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_entries (
        key TEXT PRIMARY KEY,
        value BLOB NOT NULL,
        expires_at INTEGER,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed [`KeyValueStore`].
///
/// Values are opaque blobs. Entries written with a TTL carry an absolute
/// expiry timestamp and are treated as absent (and lazily deleted) once it
/// has passed.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Open (or create) a store at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to open store: {}", e)))?;

        Self::init_schema(&pool).await?;
        debug!(path = ?db_path, "Initialized key-value store");

        Ok(Self { pool })
    }

    /// Create a store backed by a private in-memory database (for testing).
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to open store: {}", e)))?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Platform data directory location for the player state database.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("player-core").join("state.db"))
    }

    /// Open the store at [`SqliteKeyValueStore::default_path`].
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path().ok_or_else(|| {
            BridgeError::NotAvailable("No platform data directory".to_string())
        })?;
        Self::new(path).await
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Delete every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(Self::now_millis())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    BridgeError::StorageError(format!("Failed to purge entries: {}", e))
                })?;
        Ok(result.rows_affected())
    }

    /// Wrap a pool owned by the host.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let row = sqlx::query("SELECT value, expires_at FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to read entry: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: Option<i64> = row.get(1);
        if matches!(expires_at, Some(deadline) if deadline <= Self::now_millis()) {
            debug!(key = key, "Entry expired");
            if let Err(e) = self.remove(key).await {
                warn!(key = key, error = %e, "Failed to delete expired entry");
            }
            return Ok(None);
        }

        let value: Vec<u8> = row.get(0);
        Ok(Some(Bytes::from(value)))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()> {
        let now = Self::now_millis();
        let expires_at =
            ttl.map(|ttl| now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)));

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value.as_ref())
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::StorageError(format!("Failed to write entry: {}", e)))?;

        debug!(key = key, bytes = value.len(), "Stored entry");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to delete entry: {}", e)))?;
        Ok(())
    }
}
