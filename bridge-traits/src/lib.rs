//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host application.
//!
//! ## Overview
//!
//! The core decides *what* plays and *when*; everything that touches the
//! network, the audio hardware, durable storage or the user's screen is
//! delegated to a host adapter behind one of the traits below.
//!
//! ### Playback
//! - [`SourceResolver`](resolver::SourceResolver) - Track + quality to playable URL
//! - [`AudioEngine`](playback::AudioEngine) - Decoding, output, prepare/commit buffers
//!
//! ### Storage & UI
//! - [`KeyValueStore`](storage::KeyValueStore) - Persisted queue snapshots
//! - [`NotificationSink`](notification::NotificationSink) - Failure alerts
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | Storage + notifications |
//! | iOS      | host app            | Planned |
//! | Android  | host app            | Planned |
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; the core holds adapters as
//! `Arc<dyn Trait>` and calls them from spawned tasks.

pub mod error;
pub mod media;
pub mod notification;
pub mod playback;
pub mod resolver;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use media::{Catalog, PlayableSource, Quality, Track, TrackKey};
pub use notification::{Alert, AlertKind, NotificationSink};
pub use playback::{AudioEngine, EngineEvent};
pub use resolver::{ResolveError, SourceResolver};
pub use storage::KeyValueStore;
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
