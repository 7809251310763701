//! Media-manager client (Lidarr-style API).
//!
//! Reports which of an artist's releases are already in the user's library
//! and how complete each one is. Authenticates with an api-key header.

use super::{AdapterError, AlbumStatus, ManagedArtist, MediaManager};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default HTTP timeout for manager requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// API key header used by the manager.
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtistDto {
    id: u64,
    artist_name: String,
    foreign_artist_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumStatisticsDto {
    #[serde(default)]
    track_file_count: u64,
    #[serde(default)]
    percent_of_tracks: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumImageDto {
    cover_type: String,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumDto {
    foreign_album_id: String,
    title: String,
    album_type: Option<String>,
    #[serde(default)]
    secondary_types: Vec<String>,
    release_date: Option<String>,
    #[serde(default)]
    monitored: bool,
    statistics: Option<AlbumStatisticsDto>,
    #[serde(default)]
    images: Vec<AlbumImageDto>,
}

impl AlbumDto {
    fn into_status(self) -> AlbumStatus {
        let (track_file_count, percent_complete) = self
            .statistics
            .map(|s| (s.track_file_count, s.percent_of_tracks))
            .unwrap_or((0, 0.0));

        let cover_url = self
            .images
            .iter()
            .find(|img| img.cover_type == "cover")
            .or_else(|| self.images.first())
            .map(|img| img.url.clone());

        AlbumStatus {
            title: self.title,
            release_date: self.release_date,
            primary_type: self.album_type,
            secondary_types: self.secondary_types,
            cover_url,
            in_library: self.monitored || track_file_count > 0,
            percent_complete,
        }
    }
}

/// Media-manager client using direct HTTP requests.
pub struct ManagerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ManagerClient {
    /// Create a new client against the manager's API base URL
    /// (e.g. `http://localhost:8686`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<T, AdapterError> {
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| AdapterError::Json(e.to_string()))
    }
}

impl MediaManager for ManagerClient {
    async fn find_artist_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ManagedArtist>, AdapterError> {
        let url = format!("{}/api/v1/artist?mbId={}", self.base_url, external_id);
        let artists: Vec<ArtistDto> = self.get_json(url).await?;

        tracing::debug!(
            external_id,
            found = !artists.is_empty(),
            "media manager artist lookup"
        );

        Ok(artists.into_iter().next().map(|a| ManagedArtist {
            id: a.id,
            external_id: a.foreign_artist_id,
            name: a.artist_name,
        }))
    }

    async fn list_albums_with_status(
        &self,
        artist: &ManagedArtist,
    ) -> Result<HashMap<String, AlbumStatus>, AdapterError> {
        let url = format!("{}/api/v1/album?artistId={}", self.base_url, artist.id);
        let albums: Vec<AlbumDto> = self.get_json(url).await?;

        tracing::debug!(
            artist = %artist.name,
            albums = albums.len(),
            "local index built"
        );

        Ok(albums
            .into_iter()
            .map(|album| (album.foreign_album_id.clone(), album.into_status()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ManagerClient::new("http://localhost:8686", "secret");
        assert_eq!(client.base_url, "http://localhost:8686");
        assert_eq!(client.api_key, "secret");
    }

    #[test]
    fn test_artist_deserialize() {
        let json = r#"[{
            "id": 12,
            "artistName": "Nirvana",
            "foreignArtistId": "5b11f4ce-a62d-471e-81fc-a69a8278c7da",
            "monitored": true,
            "path": "/music/Nirvana"
        }]"#;

        let artists: Vec<ArtistDto> = serde_json::from_str(json).unwrap();
        assert_eq!(artists[0].id, 12);
        assert_eq!(artists[0].artist_name, "Nirvana");
    }

    #[test]
    fn test_album_into_status_complete() {
        let json = r#"{
            "foreignAlbumId": "e2b24b21-8a37-3bd8-a4d9-b176e4f0f8b6",
            "title": "Nevermind",
            "albumType": "Album",
            "secondaryTypes": [],
            "releaseDate": "1991-09-24",
            "monitored": true,
            "statistics": {"trackCount": 12, "trackFileCount": 12, "percentOfTracks": 100.0},
            "images": [{"coverType": "cover", "url": "http://covers/nevermind.jpg"}]
        }"#;

        let album: AlbumDto = serde_json::from_str(json).unwrap();
        let status = album.into_status();

        assert!(status.in_library);
        assert!(status.fully_available());
        assert_eq!(status.percent_complete, 100.0);
        assert_eq!(
            status.cover_url.as_deref(),
            Some("http://covers/nevermind.jpg")
        );
    }

    #[test]
    fn test_album_into_status_partial() {
        let json = r#"{
            "foreignAlbumId": "x",
            "title": "Incesticide",
            "albumType": "Album",
            "monitored": true,
            "statistics": {"trackCount": 15, "trackFileCount": 6, "percentOfTracks": 40.0}
        }"#;

        let album: AlbumDto = serde_json::from_str(json).unwrap();
        let status = album.into_status();

        assert!(status.in_library);
        assert!(!status.fully_available());
        assert_eq!(status.percent_complete, 40.0);
        assert_eq!(status.cover_url, None);
    }

    #[test]
    fn test_album_without_statistics_is_empty() {
        let json = r#"{
            "foreignAlbumId": "y",
            "title": "Bleach",
            "albumType": "Album",
            "monitored": false
        }"#;

        let album: AlbumDto = serde_json::from_str(json).unwrap();
        let status = album.into_status();

        assert!(!status.in_library);
        assert_eq!(status.percent_complete, 0.0);
    }
}
