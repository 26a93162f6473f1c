//! Spotify Web API client
//!
//! Every call takes the access token explicitly so the caller decides how to
//! obtain it and how to react to a `401`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};
use crate::profile::model::NowPlaying;

/// Page size for paginated endpoints
const PAGE_LIMIT: u32 = 50;

/// The signed-in platform user (`GET /me`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl PlatformUser {
    /// Display name, falling back to the user id
    pub fn username(&self) -> String {
        self.display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.id.clone())
    }

    /// First profile image, if any
    pub fn image_url(&self) -> Option<String> {
        self.images.first().map(|image| image.url.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Image {
    pub url: String,
}

/// A playlist owned or followed by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    item: Option<PlayingItem>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    name: String,
    uri: String,
    #[serde(default)]
    artists: Vec<Artist>,
    #[serde(default)]
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

impl From<PlayingItem> for NowPlaying {
    fn from(item: PlayingItem) -> Self {
        NowPlaying {
            track_name: item.name,
            artist_name: item
                .artists
                .iter()
                .map(|artist| artist.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            album_cover_url: item
                .album
                .and_then(|album| album.images.into_iter().next())
                .map(|image| image.url),
            uri: item.uri,
        }
    }
}

#[derive(Serialize)]
struct AddTracksRequest<'a> {
    uris: [&'a str; 1],
}

/// Music platform operations used by the app
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicPlatform: Send + Sync {
    /// `GET /me`
    async fn current_user(&self, token: &SecretString) -> Result<PlatformUser>;

    /// `GET /me/player/currently-playing`; `None` when nothing is playing
    async fn currently_playing(&self, token: &SecretString) -> Result<Option<NowPlaying>>;

    /// `GET /me/playlists`, all pages
    async fn playlists(&self, token: &SecretString) -> Result<Vec<Playlist>>;

    /// `POST /playlists/{id}/tracks`
    async fn add_to_playlist(
        &self,
        token: &SecretString,
        playlist_id: &str,
        track_uri: &str,
    ) -> Result<()>;
}

/// Spotify Web API client
pub struct SpotifyClient {
    client: Client,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Map non-success statuses to errors
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ScoutError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ScoutError::Api(format!("{}: {}", status, body)))
    }
}

#[async_trait]
impl MusicPlatform for SpotifyClient {
    async fn current_user(&self, token: &SecretString) -> Result<PlatformUser> {
        let response = self
            .client
            .get(self.url("/me"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn currently_playing(&self, token: &SecretString) -> Result<Option<NowPlaying>> {
        let response = self
            .client
            .get(self.url("/me/player/currently-playing"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = Self::check(response).await?.text().await?;
        parse_currently_playing(&body)
    }

    async fn playlists(&self, token: &SecretString) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::new();
        let mut next = Some(format!("{}?limit={}", self.url("/me/playlists"), PAGE_LIMIT));

        while let Some(url) = next {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token.expose_secret())
                .send()
                .await?;

            let page: Paging<Playlist> = Self::check(response).await?.json().await?;
            playlists.extend(page.items);
            next = page.next;
        }

        Ok(playlists)
    }

    async fn add_to_playlist(
        &self,
        token: &SecretString,
        playlist_id: &str,
        track_uri: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/playlists/{}/tracks", playlist_id)))
            .bearer_auth(token.expose_secret())
            .json(&AddTracksRequest { uris: [track_uri] })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

/// Parse a currently-playing body; an empty body or a null item means nothing plays
fn parse_currently_playing(body: &str) -> Result<Option<NowPlaying>> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let playing: CurrentlyPlaying = serde_json::from_str(body)?;
    Ok(playing.item.map(NowPlaying::from))
}
