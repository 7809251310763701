//! Per-search bookkeeping.

use super::types::{ReleaseType, SourceMode};
use crate::adapters::AlbumStatus;
use std::collections::{HashMap, HashSet};

/// Mutable state for one streaming search.
///
/// Tracks the resolved artist, the category filter, and delivery progress.
/// `collected` and `batch_number` only ever increase, so every emitted
/// batch carries a strictly larger cumulative total than the one before.
pub struct StreamSession {
    artist_id: String,
    artist_name: String,
    local_index: HashMap<String, AlbumStatus>,
    categories: HashSet<ReleaseType>,
    target: usize,
    source: SourceMode,
    collected: usize,
    batch_number: usize,
}

impl StreamSession {
    /// Starts a session. `source` is [`SourceMode::Local`] when the media
    /// manager knows the artist, [`SourceMode::Remote`] otherwise.
    pub fn new(
        artist_id: String,
        artist_name: String,
        local_index: HashMap<String, AlbumStatus>,
        categories: HashSet<ReleaseType>,
        target: usize,
        source: SourceMode,
    ) -> Self {
        Self {
            artist_id,
            artist_name,
            local_index,
            categories,
            target,
            source,
            collected: 0,
            batch_number: 0,
        }
    }

    pub fn artist_id(&self) -> &str {
        &self.artist_id
    }

    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }

    pub fn source(&self) -> SourceMode {
        self.source
    }

    /// Releases delivered so far.
    pub fn collected(&self) -> usize {
        self.collected
    }

    /// Remaining room before the target is met.
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.collected)
    }

    /// Whether the target has been met.
    pub fn target_reached(&self) -> bool {
        self.collected >= self.target
    }

    /// Whether a release of the given category passes the filter.
    /// An empty filter keeps everything.
    pub fn keeps(&self, category: ReleaseType) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }

    /// Takes ownership of the local index for streaming.
    pub fn take_local_index(&mut self) -> HashMap<String, AlbumStatus> {
        std::mem::take(&mut self.local_index)
    }

    /// Records a delivered batch, returning `(batch_number, cumulative_total)`.
    pub fn record_batch(&mut self, len: usize) -> (usize, usize) {
        self.batch_number += 1;
        self.collected += len;
        (self.batch_number, self.collected)
    }
}
