//! Collaborator adapters.
//!
//! The core consumes three external services through small traits:
//!
//! - [`MetadataCatalog`]: the public metadata catalog providing canonical
//!   artist/release identifiers (MusicBrainz-style API)
//! - [`MediaManager`]: the user's personal library/download manager
//!   reporting ownership and completion status (Lidarr-style API)
//! - [`CoverArt`]: cover image lookup; a not-found response normalizes to
//!   "no cover," never an error
//!
//! Each trait has a production `reqwest` implementation here. Tests supply
//! their own implementations directly.

mod cached;
mod catalog;
mod coverart;
mod manager;

pub use cached::CachedCatalog;
pub use catalog::MusicBrainzClient;
pub use coverart::CoverArtClient;
pub use manager::ManagerClient;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;

/// Errors from collaborator adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed (connect, timeout, transport).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Response body could not be parsed.
    #[error("Failed to parse response: {0}")]
    Json(String),

    /// The service answered with a non-success status.
    #[error("Upstream returned status {0}")]
    Status(u16),
}

/// A resolved catalog artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    /// Canonical catalog identifier.
    pub id: String,
    /// Canonical artist name.
    pub name: String,
}

/// One release as listed by the metadata catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRelease {
    /// Canonical release identifier.
    pub id: String,
    pub title: String,
    /// Raw primary type from the catalog's vocabulary ("Album", "EP", ...).
    pub primary_type: Option<String>,
    /// Raw secondary types ("Compilation", "Live", ...).
    pub secondary_types: Vec<String>,
    /// Possibly partial date string ("1994", "1994-03", "1994-03-08").
    pub release_date: Option<String>,
}

/// An artist record held by the media manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedArtist {
    /// The manager's internal id.
    pub id: u64,
    /// The catalog id the manager mirrors.
    pub external_id: String,
    pub name: String,
}

/// Ownership and completion status of one release in the media manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumStatus {
    pub title: String,
    pub release_date: Option<String>,
    pub primary_type: Option<String>,
    pub secondary_types: Vec<String>,
    pub cover_url: Option<String>,
    /// Whether the release is tracked in the library.
    pub in_library: bool,
    /// Percentage of tracks on disk, 0.0 to 100.0.
    pub percent_complete: f64,
}

impl AlbumStatus {
    /// Whether every track is on disk.
    pub fn fully_available(&self) -> bool {
        self.percent_complete >= 100.0
    }
}

/// The public metadata catalog.
pub trait MetadataCatalog: Send + Sync {
    /// Resolve an artist name to its canonical catalog record.
    fn search_artist(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ArtistRef>, AdapterError>> + Send;

    /// List one page of an artist's releases.
    fn releases_by_artist(
        &self,
        artist_id: &str,
        page_size: usize,
        offset: usize,
    ) -> impl Future<Output = Result<Vec<CatalogRelease>, AdapterError>> + Send;
}

/// The user's media-management service.
pub trait MediaManager: Send + Sync {
    /// Look up an artist by the catalog id it mirrors.
    fn find_artist_by_external_id(
        &self,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<ManagedArtist>, AdapterError>> + Send;

    /// Map each of the artist's releases (by catalog id) to its status.
    fn list_albums_with_status(
        &self,
        artist: &ManagedArtist,
    ) -> impl Future<Output = Result<HashMap<String, AlbumStatus>, AdapterError>> + Send;
}

/// Cover image lookup.
pub trait CoverArt: Send + Sync {
    /// Fetch a cover URL for a release. Not-found is `Ok(None)`.
    fn lookup(
        &self,
        release_id: &str,
    ) -> impl Future<Output = Result<Option<String>, AdapterError>> + Send;
}
