//! Play mode and play source tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order in which the queue advances.
///
/// The modes form a cycle: sequential, repeat-one, shuffle, sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    #[serde(alias = "sequence")]
    Sequential,
    #[serde(alias = "loopSingle", alias = "loop_single")]
    RepeatOne,
    Shuffle,
}

impl PlayMode {
    /// The next mode in the cycle.
    pub fn next(self) -> Self {
        match self {
            PlayMode::Sequential => PlayMode::RepeatOne,
            PlayMode::RepeatOne => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::Sequential,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayMode::Sequential => "sequential",
            PlayMode::RepeatOne => "repeat_one",
            PlayMode::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the current queue exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaySource {
    /// Regular browsing: albums, playlists, search results.
    #[default]
    Normal,
    /// Personal radio. Never wraps and never shuffles.
    Fm,
    /// A podcast radio station.
    Podcast {
        #[serde(default, alias = "radioId")]
        radio_id: Option<String>,
    },
}

impl PlaySource {
    pub fn is_fm(&self) -> bool {
        matches!(self, PlaySource::Fm)
    }

    /// Sources whose queue order is dictated by the backend.
    pub fn forces_sequential(&self) -> bool {
        matches!(self, PlaySource::Fm | PlaySource::Podcast { .. })
    }
}
