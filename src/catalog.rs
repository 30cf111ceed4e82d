use async_trait::async_trait;
use futures::future::join_all;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::{EngineError, Result, RetryPolicy};
use crate::model::{Album, Artist, Image, PlaylistSummary, SearchResults, Track};

const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";
const PAGE_LIMIT: u32 = 50;
const ALBUM_BATCH_SIZE: usize = 20;

/// The remote catalog the engine fetches tracks from and exports playlists
/// to. Implementations must not retain engine state; they are stateless
/// collaborators behind a narrow contract.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All tracks of one playlist, following the continuation cursor until
    /// exhausted
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>>;

    /// All tracks of the user's saved albums, labelled with their album
    async fn saved_album_tracks(&self) -> Result<Vec<Track>>;

    /// Free-text catalog search for tracks and albums
    async fn search(&self, query: &str) -> Result<SearchResults>;

    /// Tracks of the given albums, fetched in provider-sized id batches
    async fn album_tracks(&self, album_ids: &[String]) -> Result<Vec<Track>>;

    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>>;

    /// Create a playlist for the current user, returning its id
    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        public: bool,
    ) -> Result<String>;

    /// Add track URIs to a playlist. Callers are responsible for chunking
    /// to the provider's per-call limit.
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()>;

    async fn set_playlist_privacy(&self, playlist_id: &str, public: bool) -> Result<()>;

    async fn unfollow_playlist(&self, playlist_id: &str) -> Result<()>;

    async fn playlist_owner(&self, playlist_id: &str) -> Result<String>;

    async fn current_user_id(&self) -> Result<String>;
}

// Wire shapes, trimmed to the fields the engine consumes.

#[derive(Debug, Deserialize)]
struct Paged<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    #[serde(default)]
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireAlbum {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<WireArtist>,
    #[serde(default)]
    images: Vec<Image>,
    #[serde(default)]
    total_tracks: u32,
    /// Present on saved-album and album-detail responses
    #[serde(default)]
    tracks: Option<Paged<WireSimpleTrack>>,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<WireArtist>,
    album: WireAlbum,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    is_local: bool,
}

/// Track as nested inside an album object: no album of its own
#[derive(Debug, Deserialize)]
struct WireSimpleTrack {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<WireArtist>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    is_local: bool,
}

#[derive(Debug, Deserialize)]
struct WirePlaylistItem {
    #[serde(default)]
    is_local: bool,
    track: Option<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct WireSavedAlbum {
    album: WireAlbum,
}

#[derive(Debug, Deserialize)]
struct WireOwner {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WirePlaylist {
    id: String,
    name: String,
    owner: WireOwner,
    #[serde(default)]
    public: Option<bool>,
    #[serde(default)]
    tracks: Option<WirePlaylistTracksRef>,
}

#[derive(Debug, Deserialize)]
struct WirePlaylistTracksRef {
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    tracks: Option<Paged<WireTrack>>,
    albums: Option<Paged<WireAlbum>>,
}

#[derive(Debug, Deserialize)]
struct WireAlbumsResponse {
    #[serde(default)]
    albums: Vec<Option<WireAlbum>>,
}

#[derive(Debug, Deserialize)]
struct WireCreatedPlaylist {
    id: String,
}

fn convert_artists(artists: Vec<WireArtist>) -> Vec<Artist> {
    artists
        .into_iter()
        .map(|a| Artist {
            id: a.id.unwrap_or_default(),
            name: a.name,
        })
        .collect()
}

fn convert_album(album: WireAlbum) -> Album {
    Album {
        id: album.id,
        name: album.name,
        artists: convert_artists(album.artists),
        images: album.images,
        total_tracks: album.total_tracks,
    }
}

fn convert_track(track: WireTrack) -> Track {
    Track {
        // Local tracks have no provider id; the aggregator drops them anyway
        id: track.id.unwrap_or_default(),
        name: track.name,
        artists: convert_artists(track.artists),
        album: convert_album(track.album),
        duration_ms: track.duration_ms,
        explicit: track.explicit,
        uri: track.uri,
        is_local: track.is_local,
        source_id: String::new(),
        source_label: String::new(),
        is_duplicate: false,
        tempo: None,
    }
}

/// Expand a simplified album-nested track with its album's context and
/// album-derived source labels, matching how the original tool labels album
/// sources.
fn convert_album_track(track: WireSimpleTrack, album: &Album) -> Track {
    Track {
        id: track.id.unwrap_or_default(),
        name: track.name,
        artists: convert_artists(track.artists),
        album: album.clone(),
        duration_ms: track.duration_ms,
        explicit: track.explicit,
        uri: track.uri,
        is_local: track.is_local,
        source_id: format!("album-{}", album.id),
        source_label: format!("Album: {}", album.name),
        is_duplicate: false,
        tempo: None,
    }
}

/// Spotify-style HTTP catalog. Holds the bearer credential supplied by the
/// (out of scope) auth flow; a missing credential fails every call with an
/// authentication error before any request goes out.
pub struct SpotifyCatalog {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    retry: RetryPolicy,
}

impl SpotifyCatalog {
    #[must_use]
    pub fn new(access_token: Option<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(access_token: Option<String>, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn token(&self) -> Result<&str> {
        self.access_token.as_deref().ok_or_else(|| {
            EngineError::Auth("no access token available, please sign in again".to_string())
        })
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let token = self.token()?;
        let url = format!("{}{}", self.base_url, path);

        self.retry
            .run(|| async {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .bearer_auth(token)
                    .header("Content-Type", "application/json");
                if let Some(body) = &body {
                    request = request.json(body);
                }

                let response = request.send().await?;
                let status = response.status();

                if status.as_u16() == 401 {
                    return Err(EngineError::Auth(
                        "access token rejected, please sign in again".to_string(),
                    ));
                }
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(EngineError::Provider {
                        status: status.as_u16(),
                        message,
                    });
                }

                response
                    .json::<T>()
                    .await
                    .map_err(|e| EngineError::Data(e.to_string()))
            })
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(reqwest::Method::GET, path, None).await
    }

    /// For mutation endpoints whose response body is empty or irrelevant
    async fn request_ignore_body(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        let token = self.token()?;
        let url = format!("{}{}", self.base_url, path);

        self.retry
            .run(|| async {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .bearer_auth(token)
                    .header("Content-Type", "application/json");
                if let Some(body) = &body {
                    request = request.json(body);
                }

                let response = request.send().await?;
                let status = response.status();

                if status.as_u16() == 401 {
                    return Err(EngineError::Auth(
                        "access token rejected, please sign in again".to_string(),
                    ));
                }
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(EngineError::Provider {
                        status: status.as_u16(),
                        message,
                    });
                }

                Ok(())
            })
            .await
    }

    /// Follow offset/limit paging until the continuation cursor runs out
    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let separator = if path.contains('?') { '&' } else { '?' };
            let page: Paged<T> = self
                .get_json(&format!("{path}{separator}limit={PAGE_LIMIT}&offset={offset}"))
                .await?;
            let exhausted = page.next.is_none();
            items.extend(page.items);
            if exhausted {
                break;
            }
            offset += PAGE_LIMIT;
        }

        Ok(items)
    }
}

#[async_trait]
impl CatalogProvider for SpotifyCatalog {
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        let items: Vec<WirePlaylistItem> = self
            .get_all_pages(&format!("/playlists/{playlist_id}/tracks"))
            .await?;
        debug!("Fetched {} items for playlist {playlist_id}", items.len());

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let is_local = item.is_local;
                item.track.map(|t| {
                    let mut track = convert_track(t);
                    track.is_local = track.is_local || is_local;
                    track
                })
            })
            .collect())
    }

    async fn saved_album_tracks(&self) -> Result<Vec<Track>> {
        let saved: Vec<WireSavedAlbum> = self.get_all_pages("/me/albums").await?;
        debug!("Fetched {} saved albums", saved.len());

        let mut tracks = Vec::new();
        for item in saved {
            let mut album = item.album;
            let nested = album.tracks.take();
            let album = convert_album(album);
            if let Some(page) = nested {
                tracks.extend(
                    page.items
                        .into_iter()
                        .map(|t| convert_album_track(t, &album)),
                );
            }
        }

        Ok(tracks)
    }

    async fn search(&self, query: &str) -> Result<SearchResults> {
        let encoded = urlencoding::encode(query);
        let response: WireSearchResponse = self
            .get_json(&format!("/search?q={encoded}&type=track,album&limit=20"))
            .await?;

        Ok(SearchResults {
            tracks: response
                .tracks
                .map(|p| p.items.into_iter().map(convert_track).collect())
                .unwrap_or_default(),
            albums: response
                .albums
                .map(|p| p.items.into_iter().map(convert_album).collect())
                .unwrap_or_default(),
        })
    }

    async fn album_tracks(&self, album_ids: &[String]) -> Result<Vec<Track>> {
        let fetches = album_ids.chunks(ALBUM_BATCH_SIZE).map(|batch| {
            let ids = batch.join(",");
            async move {
                self.get_json::<WireAlbumsResponse>(&format!("/albums?ids={ids}"))
                    .await
            }
        });

        let mut tracks = Vec::new();
        for response in join_all(fetches).await {
            for mut album in response?.albums.into_iter().flatten() {
                let nested = album.tracks.take();
                let album = convert_album(album);
                if let Some(page) = nested {
                    tracks.extend(
                        page.items
                            .into_iter()
                            .map(|t| convert_album_track(t, &album)),
                    );
                }
            }
        }

        Ok(tracks)
    }

    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let playlists: Vec<WirePlaylist> = self.get_all_pages("/me/playlists").await?;

        Ok(playlists
            .into_iter()
            .map(|p| PlaylistSummary {
                id: p.id,
                name: p.name,
                owner_id: p.owner.id,
                public: p.public,
                total_tracks: p.tracks.map_or(0, |t| t.total),
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        public: bool,
    ) -> Result<String> {
        let user_id = self.current_user_id().await?;
        let created: WireCreatedPlaylist = self
            .request_json(
                reqwest::Method::POST,
                &format!("/users/{user_id}/playlists"),
                Some(json!({
                    "name": name,
                    "description": description,
                    "public": public,
                })),
            )
            .await?;
        Ok(created.id)
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.request_ignore_body(
            reqwest::Method::POST,
            &format!("/playlists/{playlist_id}/tracks"),
            Some(json!({ "uris": uris })),
        )
        .await
    }

    async fn set_playlist_privacy(&self, playlist_id: &str, public: bool) -> Result<()> {
        self.request_ignore_body(
            reqwest::Method::PUT,
            &format!("/playlists/{playlist_id}"),
            Some(json!({ "public": public })),
        )
        .await
    }

    async fn unfollow_playlist(&self, playlist_id: &str) -> Result<()> {
        self.request_ignore_body(
            reqwest::Method::DELETE,
            &format!("/playlists/{playlist_id}/followers"),
            None,
        )
        .await
    }

    async fn playlist_owner(&self, playlist_id: &str) -> Result<String> {
        #[derive(Debug, Deserialize)]
        struct OwnerOnly {
            owner: WireOwner,
        }
        let playlist: OwnerOnly = self
            .get_json(&format!("/playlists/{playlist_id}?fields=id,owner"))
            .await?;
        Ok(playlist.owner.id)
    }

    async fn current_user_id(&self) -> Result<String> {
        let user: WireUser = self.get_json("/me").await?;
        Ok(user.id)
    }
}
