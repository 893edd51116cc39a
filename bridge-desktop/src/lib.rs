//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - `KeyValueStore` using an SQLite database (`sqlx`)
//! - `NotificationSink` that routes alerts into `tracing`
//!
//! `SourceResolver` and `AudioEngine` have no desktop default; hosts always
//! inject their own catalog client and audio output.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{SqliteKeyValueStore, TracingNotificationSink};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SqliteKeyValueStore::open_default().await.unwrap();
//!     let notifier = TracingNotificationSink::new();
//!     // Pass both into CoreConfig::builder()
//! }
//! ```

mod kv_store;
mod notification;

pub use kv_store::SqliteKeyValueStore;
pub use notification::TracingNotificationSink;
