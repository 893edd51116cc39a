//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (source resolver,
//! audio engine, key-value store, notification sink) into the playback core
//! and hands the host a single [`PlayerHandle`]. Desktop apps typically enable
//! the `desktop-shims` feature (which depends on `bridge-desktop`) to get an
//! SQLite-backed queue store and a tracing notification sink for free.

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{PlaybackConfig, PlayerHandle, PlayerState};
pub use core_runtime::config::{CoreConfig, FeatureFlags};
pub use core_runtime::events::{CoreEvent, EventBus};
pub use core_runtime::logging::{init_logging, LoggingConfig};

use core_playback::{Player, PlayerDependencies};
use tracing::info;

#[cfg(feature = "desktop-shims")]
use bridge_traits::{AudioEngine, SourceResolver};
#[cfg(feature = "desktop-shims")]
use std::path::PathBuf;
#[cfg(feature = "desktop-shims")]
use std::sync::Arc;

/// Apply the host feature flags on top of a playback configuration.
pub fn playback_config_for(features: FeatureFlags, base: PlaybackConfig) -> PlaybackConfig {
    PlaybackConfig {
        gapless: features.enable_gapless,
        persistence: features.enable_persistence,
        abnormal_stop_recovery: features.enable_abnormal_stop_recovery,
        ..base
    }
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    player: Player,
    events: EventBus,
}

impl CoreService {
    /// Start the player from a validated [`CoreConfig`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bootstrap(config: CoreConfig, playback: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let playback = playback_config_for(config.features, playback);
        let events = EventBus::new(config.event_buffer_size);

        let dependencies = PlayerDependencies::new(
            config.source_resolver,
            config.audio_engine,
            config.key_value_store,
            config.notification_sink,
        )
        .with_clock(config.clock)
        .with_events(events.clone());

        let player = Player::spawn(dependencies, playback)?;
        info!(
            gapless = config.features.enable_gapless,
            persistence = config.features.enable_persistence,
            "Core service started"
        );
        Ok(Self { player, events })
    }

    /// Start the player with the desktop queue store at `db_path`, or the
    /// platform default location when `None`.
    #[cfg(feature = "desktop-shims")]
    pub async fn bootstrap_desktop(
        resolver: Arc<dyn SourceResolver>,
        engine: Arc<dyn AudioEngine>,
        db_path: Option<PathBuf>,
        playback: PlaybackConfig,
    ) -> Result<Self> {
        use bridge_desktop::SqliteKeyValueStore;

        let store = match db_path {
            Some(path) => SqliteKeyValueStore::new(path).await,
            None => SqliteKeyValueStore::open_default().await,
        }
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        let config = CoreConfig::builder()
            .source_resolver(resolver)
            .audio_engine(engine)
            .key_value_store(Arc::new(store))
            .build()?;
        Self::bootstrap(config, playback)
    }

    pub fn player(&self) -> PlayerHandle {
        self.player.handle()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Flush the queue snapshot and stop the player.
    pub async fn shutdown(self) -> Result<()> {
        self.player.shutdown().await?;
        info!("Core service stopped");
        Ok(())
    }
}
