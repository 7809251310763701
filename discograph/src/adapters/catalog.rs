//! MusicBrainz-style metadata catalog client.
//!
//! Fetches artist and release-group data from the public catalog's JSON web
//! service via `reqwest`, with a reusable pooled client and per-request
//! timeouts. Pacing between successive page fetches is the aggregator's
//! concern, not the client's.

use super::{AdapterError, ArtistRef, CatalogRelease, MetadataCatalog};
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout for catalog requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// The catalog requires a descriptive User-Agent from API consumers.
const USER_AGENT: &str = concat!("discograph/", env!("CARGO_PKG_VERSION"));

/// Artist entry in a search response.
#[derive(Deserialize)]
struct ArtistDto {
    id: String,
    name: String,
}

/// Top-level artist search response. Other fields are ignored.
#[derive(Deserialize)]
struct ArtistSearchDto {
    #[serde(default)]
    artists: Vec<ArtistDto>,
}

/// Release group entry in a browse response.
#[derive(Deserialize)]
struct ReleaseGroupDto {
    id: String,
    title: String,
    #[serde(rename = "primary-type")]
    primary_type: Option<String>,
    #[serde(rename = "secondary-types", default)]
    secondary_types: Vec<String>,
    #[serde(rename = "first-release-date")]
    first_release_date: Option<String>,
}

/// Top-level release-group browse response.
#[derive(Deserialize)]
struct ReleaseGroupBrowseDto {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<ReleaseGroupDto>,
}

/// Metadata catalog client using direct HTTP requests.
pub struct MusicBrainzClient {
    http: reqwest::Client,
    base_url: String,
}

impl MusicBrainzClient {
    /// Create a new client against the given API base URL
    /// (e.g. `https://musicbrainz.org/ws/2`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AdapterError> {
        let response = request
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

impl MetadataCatalog for MusicBrainzClient {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, AdapterError> {
        let request = self
            .http
            .get(format!("{}/artist", self.base_url))
            .query(&[("query", name), ("limit", "1"), ("fmt", "json")]);
        let data: ArtistSearchDto = self.get_json(request).await?;

        let artist = data.artists.into_iter().next();
        tracing::debug!(query = name, found = artist.is_some(), "artist search");

        Ok(artist.map(|a| ArtistRef {
            id: a.id,
            name: a.name,
        }))
    }

    async fn releases_by_artist(
        &self,
        artist_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<Vec<CatalogRelease>, AdapterError> {
        let request = self
            .http
            .get(format!("{}/release-group", self.base_url))
            .query(&[("artist", artist_id), ("fmt", "json")])
            .query(&[("limit", page_size), ("offset", offset)]);
        let data: ReleaseGroupBrowseDto = self.get_json(request).await?;

        tracing::debug!(
            artist_id,
            offset,
            returned = data.release_groups.len(),
            "release page fetched"
        );

        Ok(data
            .release_groups
            .into_iter()
            .map(|rg| CatalogRelease {
                id: rg.id,
                title: rg.title,
                primary_type: rg.primary_type,
                secondary_types: rg.secondary_types,
                release_date: rg.first_release_date,
            })
            .collect())
    }
}
