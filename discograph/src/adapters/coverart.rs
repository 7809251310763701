//! Cover art archive client.
//!
//! Looks up front-cover images by release id. A missing cover (404) is a
//! normal outcome (`Ok(None)`), never an error; transport failures and
//! other non-success statuses surface as errors.

use super::{AdapterError, CoverArt};
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout for cover art requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct ImageDto {
    #[serde(default)]
    front: bool,
    image: String,
}

#[derive(Deserialize)]
struct CoverResponseDto {
    #[serde(default)]
    images: Vec<ImageDto>,
}

/// Cover art client using direct HTTP requests.
pub struct CoverArtClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoverArtClient {
    /// Create a new client against the archive's base URL
    /// (e.g. `https://coverartarchive.org`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl CoverArt for CoverArtClient {
    async fn lookup(&self, release_id: &str) -> Result<Option<String>, AdapterError> {
        let url = format!("{}/release-group/{}", self.base_url, release_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let status = response.status();
        // No cover registered for this release
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AdapterError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;
        let data: CoverResponseDto =
            serde_json::from_slice(&bytes).map_err(|e| AdapterError::Json(e.to_string()))?;

        Ok(data
            .images
            .iter()
            .find(|img| img.front)
            .or_else(|| data.images.first())
            .map(|img| img.image.clone()))
    }
}
