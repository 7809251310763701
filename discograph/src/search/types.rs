//! Request, result, and event types for the streaming search.

use crate::adapters::{AdapterError, AlbumStatus, CatalogRelease};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Errors produced while running a streaming search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request carried an empty or whitespace-only artist name.
    #[error("artist name must not be empty")]
    EmptyArtistName,

    /// The catalog returned no artist for the query.
    #[error("no artist found matching '{0}'")]
    ArtistNotFound(String),

    /// A collaborator call failed.
    #[error("upstream failure: {0}")]
    Upstream(#[from] AdapterError),

    /// The consumer dropped the event receiver mid-stream.
    #[error("search cancelled by consumer")]
    Cancelled,
}

/// Normalized release category.
///
/// Upstream sources spell primary types inconsistently (`"Album"`, `"EP"`,
/// `"Single"`, missing entirely); everything is folded into one of these
/// four buckets before filtering or display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Album,
    Ep,
    Single,
    Other,
}

impl ReleaseType {
    /// Fold a raw primary-type string into a category. Unknown and missing
    /// types land in [`ReleaseType::Other`].
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("album") => ReleaseType::Album,
            Some("ep") => ReleaseType::Ep,
            Some("single") => ReleaseType::Single,
            _ => ReleaseType::Other,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "album" => Some(ReleaseType::Album),
            "ep" => Some(ReleaseType::Ep),
            "single" => Some(ReleaseType::Single),
            "other" => Some(ReleaseType::Other),
            _ => None,
        }
    }

    /// Lowercase label, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Album => "album",
            ReleaseType::Ep => "ep",
            ReleaseType::Single => "single",
            ReleaseType::Other => "other",
        }
    }
}

impl std::fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a comma-separated category filter such as `"album,ep"`.
///
/// An empty or whitespace-only string means no filtering. Unknown tokens
/// are rejected so that a typo never silently returns everything.
pub fn parse_category_filter(raw: &str) -> Result<HashSet<ReleaseType>, String> {
    let mut categories = HashSet::new();
    for token in raw.split(',') {
        let token = token.trim().to_ascii_lowercase();
        if token.is_empty() {
            continue;
        }
        match ReleaseType::from_token(&token) {
            Some(category) => {
                categories.insert(category);
            }
            None => return Err(format!("unknown release category '{token}'")),
        }
    }
    Ok(categories)
}

/// How many results the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCount {
    /// An explicit count.
    Count(usize),
    /// Everything the source has, subject to the configured hard cap.
    All,
}

impl TargetCount {
    /// Parses a target from its textual form: a positive integer or `"all"`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Ok(TargetCount::All);
        }
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => Ok(TargetCount::Count(n)),
            _ => Err(format!("invalid target count '{raw}'")),
        }
    }

    /// Resolves to a concrete count, never exceeding `hard_cap`.
    pub fn resolve(&self, hard_cap: usize) -> usize {
        match self {
            TargetCount::Count(n) => (*n).min(hard_cap),
            TargetCount::All => hard_cap,
        }
    }
}

impl Default for TargetCount {
    fn default() -> Self {
        TargetCount::Count(crate::config::DEFAULT_PAGE_SIZE)
    }
}

/// A streaming search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Artist to search for. Must be non-empty after trimming.
    pub artist_name: String,
    /// How many releases to deliver at most.
    pub target: TargetCount,
    /// Categories to keep. Empty means keep everything.
    pub categories: HashSet<ReleaseType>,
}

impl SearchRequest {
    /// A request for the default number of releases across all categories.
    pub fn new(artist_name: impl Into<String>) -> Self {
        Self {
            artist_name: artist_name.into(),
            target: TargetCount::default(),
            categories: HashSet::new(),
        }
    }

    /// Replaces the target count.
    pub fn with_target(mut self, target: TargetCount) -> Self {
        self.target = target;
        self
    }

    /// Replaces the category filter.
    pub fn with_categories(mut self, categories: HashSet<ReleaseType>) -> Self {
        self.categories = categories;
        self
    }

    /// Rejects requests that cannot be run.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.artist_name.trim().is_empty() {
            return Err(SearchError::EmptyArtistName);
        }
        Ok(())
    }
}

/// Where a batch of results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Built from the media manager's local index.
    Local,
    /// Paginated from the remote catalog.
    Remote,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SourceMode::Local => "local",
            SourceMode::Remote => "remote",
        })
    }
}

/// A release enriched with library status and cover art, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRelease {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub release_date: Option<String>,
    pub release_type: ReleaseType,
    pub secondary_types: Vec<String>,
    pub cover_url: Option<String>,
    pub in_library: bool,
    pub fully_available: bool,
    pub percent_complete: f64,
}

impl EnrichedRelease {
    /// Builds a result from a local-index entry.
    pub fn from_local(id: &str, status: &AlbumStatus, artist_name: &str) -> Self {
        Self {
            id: id.to_string(),
            title: status.title.clone(),
            artist_name: artist_name.to_string(),
            release_date: status.release_date.clone(),
            release_type: ReleaseType::normalize(status.primary_type.as_deref()),
            secondary_types: status.secondary_types.clone(),
            cover_url: status.cover_url.clone(),
            in_library: status.in_library,
            fully_available: status.fully_available(),
            percent_complete: status.percent_complete,
        }
    }

    /// Builds a result from a remote catalog release. Remote releases are
    /// never in the library; a matching local entry would have routed the
    /// whole search through the local index instead.
    pub fn from_remote(release: CatalogRelease, artist_name: &str, cover_url: Option<String>) -> Self {
        Self {
            id: release.id,
            title: release.title,
            artist_name: artist_name.to_string(),
            release_date: release.release_date,
            release_type: ReleaseType::normalize(release.primary_type.as_deref()),
            secondary_types: release.secondary_types,
            cover_url,
            in_library: false,
            fully_available: false,
            percent_complete: 0.0,
        }
    }
}

/// Progress events pushed to the consumer, in order:
/// one `Start`, one `ArtistStatus`, zero or more `Batch`es, then exactly
/// one terminal `Complete` or `Error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SearchEvent {
    /// The search was accepted.
    #[serde(rename_all = "camelCase")]
    Start { total_requested: usize },

    /// The artist was resolved and the local index consulted.
    #[serde(rename_all = "camelCase")]
    ArtistStatus {
        found_locally: bool,
        artist_name: String,
        external_artist_id: String,
        local_index_size: usize,
    },

    /// A batch of enriched releases.
    #[serde(rename_all = "camelCase")]
    Batch {
        releases: Vec<EnrichedRelease>,
        cumulative_total: usize,
        has_more: bool,
        batch_number: usize,
        source: SourceMode,
    },

    /// The search finished normally.
    #[serde(rename_all = "camelCase")]
    Complete { total: usize, source: SourceMode },

    /// The search failed; no further events follow.
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_and_unknowns() {
        assert_eq!(ReleaseType::normalize(Some("Album")), ReleaseType::Album);
        assert_eq!(ReleaseType::normalize(Some("EP")), ReleaseType::Ep);
        assert_eq!(ReleaseType::normalize(Some("single")), ReleaseType::Single);
        assert_eq!(ReleaseType::normalize(Some("Broadcast")), ReleaseType::Other);
        assert_eq!(ReleaseType::normalize(None), ReleaseType::Other);
    }

    #[test]
    fn test_parse_category_filter() {
        let set = parse_category_filter("album, ep").unwrap();
        assert!(set.contains(&ReleaseType::Album));
        assert!(set.contains(&ReleaseType::Ep));
        assert_eq!(set.len(), 2);

        assert!(parse_category_filter("").unwrap().is_empty());
        assert!(parse_category_filter("albums").is_err());
    }

    #[test]
    fn test_target_count_parse_and_resolve() {
        assert_eq!(TargetCount::parse("50").unwrap(), TargetCount::Count(50));
        assert_eq!(TargetCount::parse("ALL").unwrap(), TargetCount::All);
        assert!(TargetCount::parse("0").is_err());
        assert!(TargetCount::parse("-3").is_err());
        assert!(TargetCount::parse("many").is_err());

        assert_eq!(TargetCount::Count(50).resolve(500), 50);
        assert_eq!(TargetCount::Count(9_999).resolve(500), 500);
        assert_eq!(TargetCount::All.resolve(500), 500);
    }

    #[test]
    fn test_request_validation() {
        assert!(SearchRequest::new("Nirvana").validate().is_ok());
        assert!(matches!(
            SearchRequest::new("   ").validate(),
            Err(SearchError::EmptyArtistName)
        ));
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = SearchEvent::Batch {
            releases: vec![],
            cumulative_total: 30,
            has_more: false,
            batch_number: 1,
            source: SourceMode::Remote,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "batch");
        assert_eq!(json["cumulativeTotal"], 30);
        assert_eq!(json["hasMore"], false);
        assert_eq!(json["source"], "remote");
    }

    #[test]
    fn test_enriched_release_from_remote_is_never_in_library() {
        let release = CatalogRelease {
            id: "rg-1".to_string(),
            title: "In Utero".to_string(),
            primary_type: Some("Album".to_string()),
            secondary_types: vec![],
            release_date: Some("1993-09-21".to_string()),
        };
        let enriched = EnrichedRelease::from_remote(release, "Nirvana", None);

        assert!(!enriched.in_library);
        assert!(!enriched.fully_available);
        assert_eq!(enriched.release_type, ReleaseType::Album);
        assert_eq!(enriched.artist_name, "Nirvana");
    }
}
