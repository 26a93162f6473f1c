//! Profile document model
//!
//! Field names follow the document store's camelCase layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

/// Liked songs are stored as song objects from this version on
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometers (haversine)
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Track currently playing on the user's device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub track_name: String,
    pub artist_name: String,
    #[serde(default)]
    pub album_cover_url: Option<String>,
    pub uri: String,
}

/// What a user is listening to and where, as of `last_updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub album_cover_url: Option<String>,
    #[serde(default)]
    pub track_uri: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl PresenceSnapshot {
    pub fn new(
        now_playing: Option<&NowPlaying>,
        location: Option<Coordinates>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            track_name: now_playing.map(|t| t.track_name.clone()),
            artist_name: now_playing.map(|t| t.artist_name.clone()),
            album_cover_url: now_playing.and_then(|t| t.album_cover_url.clone()),
            track_uri: now_playing.map(|t| t.uri.clone()),
            latitude: location.map(|c| c.latitude),
            longitude: location.map(|c| c.longitude),
            last_updated,
        }
    }

    pub fn location(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }

    /// The playing track, if the snapshot has one
    pub fn now_playing(&self) -> Option<NowPlaying> {
        Some(NowPlaying {
            track_name: self.track_name.clone()?,
            artist_name: self.artist_name.clone().unwrap_or_default(),
            album_cover_url: self.album_cover_url.clone(),
            uri: self.track_uri.clone()?,
        })
    }
}

/// A song in the user's liked set, keyed by `uri`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedSong {
    pub uri: String,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub album_cover_url: Option<String>,
}

impl From<&NowPlaying> for LikedSong {
    fn from(track: &NowPlaying) -> Self {
        Self {
            uri: track.uri.clone(),
            track_name: track.track_name.clone(),
            artist_name: track.artist_name.clone(),
            album_cover_url: track.album_cover_url.clone(),
        }
    }
}

/// Stored entry: plain URI (schema 1) or song object (schema 2)
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLikedEntry {
    Uri(String),
    Song(LikedSong),
}

/// Ordered set of liked songs without duplicate URIs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LikedSongs(Vec<LikedSong>);

impl LikedSongs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a song; returns false when the uri was already present
    pub fn insert(&mut self, song: LikedSong) -> bool {
        if self.contains(&song.uri) {
            return false;
        }
        self.0.push(song);
        true
    }

    /// Remove by uri; returns false when it was not present
    pub fn remove(&mut self, uri: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|song| song.uri != uri);
        self.0.len() != before
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.0.iter().any(|song| song.uri == uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LikedSong> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<LikedSong> for LikedSongs {
    fn from_iter<I: IntoIterator<Item = LikedSong>>(iter: I) -> Self {
        let mut songs = LikedSongs::new();
        for song in iter {
            songs.insert(song);
        }
        songs
    }
}

impl<'de> Deserialize<'de> for LikedSongs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<StoredLikedEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                StoredLikedEntry::Uri(uri) => LikedSong {
                    uri,
                    track_name: String::new(),
                    artist_name: String::new(),
                    album_cover_url: None,
                },
                StoredLikedEntry::Song(song) => song,
            })
            .filter(|song| !song.uri.is_empty())
            .collect())
    }
}

/// Settings published to subscribers whenever they change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub is_ghost_mode: bool,
    pub is_grid_view: bool,
}

fn legacy_schema_version() -> u32 {
    1
}

/// Per-user profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default, rename = "profilePic")]
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub is_ghost_mode: bool,
    #[serde(default)]
    pub is_grid_view: bool,
    #[serde(default)]
    pub liked_songs: LikedSongs,
    #[serde(default)]
    pub presence: Option<PresenceSnapshot>,
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
}

impl UserProfile {
    /// A freshly signed-up profile
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            profile_pic_url: None,
            is_ghost_mode: false,
            is_grid_view: false,
            liked_songs: LikedSongs::new(),
            presence: None,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            is_ghost_mode: self.is_ghost_mode,
            is_grid_view: self.is_grid_view,
        }
    }

    /// Whether the document was written with an older liked-songs layout
    pub fn needs_migration(&self) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION
    }

    /// Bring a document read from storage up to the current schema
    ///
    /// The liked-songs layout is already normalized by deserialization, so
    /// only the version marker changes.
    pub fn migrated(mut self) -> Self {
        if self.needs_migration() {
            tracing::debug!(
                "Migrating profile {} from schema {} to {}",
                self.id,
                self.schema_version,
                CURRENT_SCHEMA_VERSION
            );
            self.schema_version = CURRENT_SCHEMA_VERSION;
        }
        self
    }
}

/// A partial update of a profile document
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    /// Replace the presence snapshot
    Presence(PresenceSnapshot),
    GhostMode(bool),
    GridView(bool),
    /// Replace the full liked-songs set
    LikedSongs(LikedSongs),
    Username(String),
    ProfilePic(String),
}

impl ProfileUpdate {
    /// JSON merge-patch body for the document store
    pub fn to_patch(&self) -> serde_json::Value {
        match self {
            ProfileUpdate::Presence(presence) => json!({ "presence": presence }),
            ProfileUpdate::GhostMode(on) => json!({ "isGhostMode": on }),
            ProfileUpdate::GridView(on) => json!({ "isGridView": on }),
            ProfileUpdate::LikedSongs(songs) => json!({
                "likedSongs": songs,
                "schemaVersion": CURRENT_SCHEMA_VERSION,
            }),
            ProfileUpdate::Username(name) => json!({ "username": name }),
            ProfileUpdate::ProfilePic(url) => json!({ "profilePic": url }),
        }
    }

    /// Apply the same change to a local copy
    pub fn apply(&self, profile: &mut UserProfile) {
        match self {
            ProfileUpdate::Presence(presence) => profile.presence = Some(presence.clone()),
            ProfileUpdate::GhostMode(on) => profile.is_ghost_mode = *on,
            ProfileUpdate::GridView(on) => profile.is_grid_view = *on,
            ProfileUpdate::LikedSongs(songs) => {
                profile.liked_songs = songs.clone();
                profile.schema_version = CURRENT_SCHEMA_VERSION;
            }
            ProfileUpdate::Username(name) => profile.username = name.clone(),
            ProfileUpdate::ProfilePic(url) => profile.profile_pic_url = Some(url.clone()),
        }
    }

    /// Whether subscribers to settings need to hear about this change
    pub fn touches_settings(&self) -> bool {
        matches!(self, ProfileUpdate::GhostMode(_) | ProfileUpdate::GridView(_))
    }
}

/// Another listener and how far away they are
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyListener {
    pub profile: UserProfile,
    pub distance_km: f64,
}

/// Visible listeners split by the configured radius, closest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhood {
    pub nearby: Vec<NearbyListener>,
    pub distant: Vec<NearbyListener>,
}
