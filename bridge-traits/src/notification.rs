//! User-facing notification bridge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Category of an alert, used by hosts to pick icons or haptics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The catalog has no licensed source for the content.
    Unavailable,
    /// Generic playback failure (network or otherwise).
    PlaybackFailure,
}

/// A short alert shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub kind: AlertKind,
}

impl Alert {
    pub fn new(kind: AlertKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}

/// Surfaces alerts to the user (toast, banner, system notification).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, alert: Alert) -> Result<()>;
}
