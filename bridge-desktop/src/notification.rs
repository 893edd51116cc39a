//! Notification sink that writes alerts to the tracing pipeline.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    notification::{Alert, AlertKind, NotificationSink},
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, warn};

/// Desktop stand-in for a toast/banner UI: alerts become log records.
#[derive(Debug, Default)]
pub struct TracingNotificationSink {
    delivered: AtomicU64,
}

impl TracingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, alert: Alert) -> Result<()> {
        match alert.kind {
            AlertKind::Unavailable => {
                warn!(title = %alert.title, message = %alert.message, "Content unavailable")
            }
            AlertKind::PlaybackFailure => {
                error!(title = %alert.title, message = %alert.message, "Playback failure")
            }
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
