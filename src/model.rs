use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub images: Vec<Image>,
    /// Track count declared by the provider, not necessarily fetched
    #[serde(default)]
    pub total_tracks: u32,
}

/// Tempo data resolved from the external BPM provider.
///
/// Only the tempo lookup client produces these; the rest of the engine
/// treats them as opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TempoResult {
    pub bpm: f64,
    /// Normalized to 0..1 from the provider's raw count signal
    pub confidence: f64,
    pub source: String,
    pub key: Option<String>,
    pub time_signature: Option<String>,
}

/// A track normalized into the engine's common shape.
///
/// The provider-assigned fields are immutable once fetched; `source_id`,
/// `source_label`, `is_duplicate` and `tempo` are attached by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    pub album: Album,
    pub duration_ms: u64,
    pub explicit: bool,
    pub uri: String,
    /// Locally-stored tracks carry no canonical provider identity
    #[serde(default)]
    pub is_local: bool,

    /// Which playlist/album/search batch this copy came from
    #[serde(default)]
    pub source_id: String,
    /// Display name of that source
    #[serde(default)]
    pub source_label: String,
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub tempo: Option<TempoResult>,
}

impl Track {
    /// Name of the first listed artist, or empty for pathological data
    #[must_use]
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map_or("", |a| a.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub public: Option<bool>,
    pub total_tracks: u32,
}

/// Result of a free-text catalog search
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
}

/// A source of tracks selected for a load operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Playlist { id: String, name: String },
    SavedAlbums,
}

impl SourceSelection {
    #[must_use]
    pub fn playlist(id: &str, name: &str) -> Self {
        Self::Playlist {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}
