//! Memoizing decorator for the metadata catalog.
//!
//! Wraps any [`MetadataCatalog`] and caches artist resolutions and release
//! pages in a shared [`MemoCache`], so repeated searches for the same artist
//! skip the catalog entirely while the entries are fresh.

use super::{AdapterError, ArtistRef, CatalogRelease, MetadataCatalog};
use crate::cache::{MemoCache, MemoizeError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// How long a resolved artist stays fresh.
const ARTIST_TTL: Duration = Duration::from_secs(60 * 60);

/// How long a release page stays fresh.
const RELEASES_TTL: Duration = Duration::from_secs(15 * 60);

/// A [`MetadataCatalog`] that memoizes lookups through a [`MemoCache`].
pub struct CachedCatalog<C> {
    inner: C,
    cache: Arc<MemoCache>,
}

impl<C: MetadataCatalog> CachedCatalog<C> {
    /// Wrap a catalog with the given cache.
    pub fn new(inner: C, cache: Arc<MemoCache>) -> Self {
        Self { inner, cache }
    }
}

fn flatten(e: MemoizeError<AdapterError>) -> AdapterError {
    match e {
        MemoizeError::Producer(e) => e,
        MemoizeError::Codec(msg) => AdapterError::Json(msg),
    }
}

impl<C: MetadataCatalog> MetadataCatalog for CachedCatalog<C> {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, AdapterError> {
        self.cache
            .memoize(
                "catalog.artist-search",
                &json!({ "name": name }),
                ARTIST_TTL,
                || self.inner.search_artist(name),
            )
            .await
            .map_err(flatten)
    }

    async fn releases_by_artist(
        &self,
        artist_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<Vec<CatalogRelease>, AdapterError> {
        self.cache
            .memoize(
                "catalog.releases",
                &json!({
                    "artist": artist_id,
                    "limit": page_size,
                    "offset": offset,
                }),
                RELEASES_TTL,
                || self.inner.releases_by_artist(artist_id, page_size, offset),
            )
            .await
            .map_err(flatten)
    }
}
