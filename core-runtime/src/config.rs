//! # Core Configuration Module
//!
//! Collects the host bridges and runtime settings the player core needs.
//!
//! ## Overview
//!
//! [`CoreConfig`] is built with [`CoreConfigBuilder`] and validated fail-fast:
//! a missing required bridge produces [`Error::CapabilityMissing`] with a
//! message telling the host what to inject.
//!
//! ## Required Dependencies
//!
//! - `SourceResolver` - Resolves tracks to stream URLs
//! - `AudioEngine` - Decodes and renders audio
//! - `KeyValueStore` - Persists the queue snapshot
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `NotificationSink` - Failure alerts (desktop default: tracing sink)
//! - `Clock` - Wall clock for snapshot timestamps (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .source_resolver(Arc::new(MyResolver))
//!     .audio_engine(Arc::new(MyEngine))
//!     .key_value_store(Arc::new(MyStore))
//!     .enable_gapless(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioEngine, Clock, KeyValueStore, NotificationSink, SourceResolver, SystemClock,
};
use std::sync::Arc;

/// Core configuration for the player.
#[derive(Clone)]
pub struct CoreConfig {
    pub source_resolver: Arc<dyn SourceResolver>,
    pub audio_engine: Arc<dyn AudioEngine>,
    pub key_value_store: Arc<dyn KeyValueStore>,
    pub notification_sink: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("source_resolver", &"SourceResolver { ... }")
            .field("audio_engine", &"AudioEngine { ... }")
            .field("key_value_store", &"KeyValueStore { ... }")
            .field("notification_sink", &"NotificationSink { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags for optional player behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Preload the successor and switch to it without a gap
    pub enable_gapless: bool,

    /// Write the queue snapshot to the key-value store
    pub enable_persistence: bool,

    /// Reload a track that stops far before its end
    pub enable_abnormal_stop_recovery: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_gapless: true,
            enable_persistence: true,
            enable_abnormal_stop_recovery: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates settings that the builder cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 65_536 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 65,536".to_string(),
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_notification_sink() -> Result<Arc<dyn NotificationSink>> {
    use bridge_desktop::TracingNotificationSink;

    let sink: Arc<dyn NotificationSink> = Arc::new(TracingNotificationSink::new());
    Ok(sink)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_notification_sink() -> Result<Arc<dyn NotificationSink>> {
    Err(capability_missing(
        "NotificationSink",
        "NotificationSink implementation is required for failure alerts. \
         Desktop: enable the 'desktop-shims' feature to use TracingNotificationSink. \
         Mobile: inject a toast/banner adapter.",
    ))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    source_resolver: Option<Arc<dyn SourceResolver>>,
    audio_engine: Option<Arc<dyn AudioEngine>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the source resolver (required).
    pub fn source_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.source_resolver = Some(resolver);
        self
    }

    /// Sets the audio engine (required).
    pub fn audio_engine(mut self, engine: Arc<dyn AudioEngine>) -> Self {
        self.audio_engine = Some(engine);
        self
    }

    /// Sets the key-value store used for queue persistence (required).
    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the notification sink.
    ///
    /// If not provided, the desktop tracing sink is used when the
    /// `desktop-shims` feature is enabled.
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_gapless(mut self, enable: bool) -> Self {
        self.features.enable_gapless = enable;
        self
    }

    pub fn enable_persistence(mut self, enable: bool) -> Self {
        self.features.enable_persistence = enable;
        self
    }

    pub fn enable_abnormal_stop_recovery(mut self, enable: bool) -> Self {
        self.features.enable_abnormal_stop_recovery = enable;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when a required bridge is absent
    /// and [`Error::Config`] when a setting is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let source_resolver = self.source_resolver.ok_or_else(|| {
            capability_missing(
                "SourceResolver",
                "SourceResolver implementation is required to turn tracks into stream URLs. \
                 Inject the catalog client adapter.",
            )
        })?;

        let audio_engine = self.audio_engine.ok_or_else(|| {
            capability_missing(
                "AudioEngine",
                "AudioEngine implementation is required for playback. \
                 Inject the platform audio adapter (AVFoundation, ExoPlayer, ...).",
            )
        })?;

        let key_value_store = self.key_value_store.ok_or_else(|| {
            capability_missing(
                "KeyValueStore",
                "KeyValueStore implementation is required for queue persistence. \
                 Desktop: use bridge_desktop::SqliteKeyValueStore. \
                 Mobile: inject a file or DataStore backed store.",
            )
        })?;

        let notification_sink = match self.notification_sink {
            Some(sink) => sink,
            None => provide_default_notification_sink()?,
        };

        let config = CoreConfig {
            source_resolver,
            audio_engine,
            key_value_store,
            notification_sink,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        Alert, PlayableSource, Quality, ResolveError, Track,
    };
    use bytes::Bytes;
    use mockall::mock;
    use std::time::Duration;

    mock! {
        pub Resolver {}

        #[async_trait]
        impl SourceResolver for Resolver {
            async fn resolve(
                &self,
                track: &Track,
                quality: Quality,
            ) -> std::result::Result<PlayableSource, ResolveError>;
        }
    }

    mock! {
        pub Engine {}

        #[async_trait]
        impl AudioEngine for Engine {
            async fn play(&self, source: &PlayableSource) -> BridgeResult<()>;
            async fn pause(&self) -> BridgeResult<()>;
            async fn resume(&self) -> BridgeResult<()>;
            async fn stop(&self) -> BridgeResult<()>;
            async fn seek(&self, position: Duration) -> BridgeResult<()>;
            async fn prepare_next(&self, source: &PlayableSource) -> BridgeResult<()>;
            async fn cancel_next_preparation(&self) -> BridgeResult<()>;
            async fn commit_to_prepared(&self, seek_to: Option<Duration>) -> BridgeResult<()>;
            fn is_next_prepared(&self) -> bool;
            fn current_time(&self) -> Duration;
        }
    }

    mock! {
        pub Store {}

        #[async_trait]
        impl KeyValueStore for Store {
            async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>>;
            async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> BridgeResult<()>;
            async fn remove(&self, key: &str) -> BridgeResult<()>;
        }
    }

    mock! {
        pub Notifier {}

        #[async_trait]
        impl NotificationSink for Notifier {
            async fn notify(&self, alert: Alert) -> BridgeResult<()>;
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .audio_engine(Arc::new(MockEngine::new()))
            .key_value_store(Arc::new(MockStore::new()))
            .notification_sink(Arc::new(MockNotifier::new()))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_builder_requires_resolver() {
        let result = CoreConfig::builder()
            .audio_engine(Arc::new(MockEngine::new()))
            .key_value_store(Arc::new(MockStore::new()))
            .notification_sink(Arc::new(MockNotifier::new()))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "SourceResolver")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_requires_engine() {
        let result = CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .key_value_store(Arc::new(MockStore::new()))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "AudioEngine"
        ));
    }

    #[test]
    fn test_builder_requires_store() {
        let result = CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .audio_engine(Arc::new(MockEngine::new()))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "KeyValueStore"
        ));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_notification_sink_required_without_shims() {
        let result = CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .audio_engine(Arc::new(MockEngine::new()))
            .key_value_store(Arc::new(MockStore::new()))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "NotificationSink"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_notification_sink_defaults_with_shims() {
        let result = CoreConfig::builder()
            .source_resolver(Arc::new(MockResolver::new()))
            .audio_engine(Arc::new(MockEngine::new()))
            .key_value_store(Arc::new(MockStore::new()))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_feature_toggles() {
        let config = complete_builder()
            .enable_gapless(false)
            .enable_persistence(false)
            .build()
            .unwrap();

        assert!(!config.features.enable_gapless);
        assert!(!config.features.enable_persistence);
        assert!(config.features.enable_abnormal_stop_recovery);
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("SourceResolver { ... }"));
        assert!(rendered.contains("event_buffer_size"));
    }
}
