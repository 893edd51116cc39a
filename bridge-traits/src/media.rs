//! Media identity types shared by the core and every host adapter.
//!
//! The core never inspects track metadata beyond identity: two [`Track`]
//! values are the same track when their [`TrackKey`]s are equal, regardless
//! of title, artwork or any other field that a catalog may refresh.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Backend catalog a track was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Catalog {
    /// The default streaming catalog.
    Primary,
    /// The secondary catalog (tracks from a partner platform).
    Secondary,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::Primary
    }
}

/// Identity of a track: the catalog it belongs to plus the catalog-local id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackKey {
    #[serde(default)]
    pub catalog: Catalog,
    pub id: String,
}

impl TrackKey {
    pub fn new(catalog: Catalog, id: impl Into<String>) -> Self {
        Self {
            catalog,
            id: id.into(),
        }
    }

    pub fn primary(id: impl Into<String>) -> Self {
        Self::new(Catalog::Primary, id)
    }

    pub fn secondary(id: impl Into<String>) -> Self {
        Self::new(Catalog::Secondary, id)
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.catalog {
            Catalog::Primary => write!(f, "primary:{}", self.id),
            Catalog::Secondary => write!(f, "secondary:{}", self.id),
        }
    }
}

/// A playable catalog entry.
///
/// Equality and hashing only consider [`Track::key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub key: TrackKey,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Catalog-reported duration, when known.
    #[serde(default, with = "duration_millis")]
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(key: TrackKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            artist: None,
            album: None,
            duration: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Returns true when both values refer to the same catalog entry.
    pub fn same_as(&self, other: &Track) -> bool {
        self.key == other.key
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Requested stream quality, lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Standard,
    Higher,
    #[default]
    ExHigh,
    Lossless,
    HiRes,
    Master,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Standard => "Standard",
            Quality::Higher => "Higher",
            Quality::ExHigh => "Extra High",
            Quality::Lossless => "Lossless",
            Quality::HiRes => "Hi-Res",
            Quality::Master => "Master",
        }
    }
}

/// A resolved, directly playable stream for one track at one quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableSource {
    pub url: String,
    pub quality: Quality,
    /// Duration reported by the resolver, if any.
    pub duration: Option<Duration>,
}

impl PlayableSource {
    pub fn new(url: impl Into<String>, quality: Quality) -> Self {
        Self {
            url: url.into(),
            quality,
            duration: None,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let millis = Option::<u64>::deserialize(d)?;
        Ok(millis.map(Duration::from_millis))
    }
}
