//! The streaming search engine.
//!
//! [`StreamingSearch`] owns the three collaborator adapters and a bounded
//! pool of search sessions. Each search resolves the artist, decides between
//! the local and remote source, and pushes [`SearchEvent`]s over the caller's
//! channel until the stream completes, fails, or the caller hangs up.

use super::session::StreamSession;
use super::types::{EnrichedRelease, ReleaseType, SearchError, SearchEvent, SearchRequest, SourceMode};
use crate::adapters::{AlbumStatus, CoverArt, MediaManager, MetadataCatalog};
use crate::config::SearchSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pushes an event, translating a hung-up consumer into cancellation.
async fn send(tx: &mpsc::Sender<SearchEvent>, event: SearchEvent) -> Result<(), SearchError> {
    tx.send(event).await.map_err(|_| SearchError::Cancelled)
}

/// Streaming catalog aggregator over a metadata catalog, a media manager,
/// and a cover art source.
pub struct StreamingSearch<C, M, A> {
    catalog: C,
    manager: M,
    cover: A,
    settings: SearchSettings,
    sessions: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl<C, M, A> StreamingSearch<C, M, A>
where
    C: MetadataCatalog,
    M: MediaManager,
    A: CoverArt,
{
    /// Create an aggregator with a session pool sized from the settings.
    pub fn new(settings: SearchSettings, catalog: C, manager: M, cover: A) -> Self {
        Self {
            sessions: Arc::new(Semaphore::new(settings.max_sessions)),
            shutdown: CancellationToken::new(),
            catalog,
            manager,
            cover,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Session slots currently free.
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }

    /// Cancels all running searches and rejects new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs one search to completion, pushing events to `tx`.
    ///
    /// Waits for a free session slot first. Every outcome other than
    /// cancellation ends the stream with a terminal `Complete` or `Error`
    /// event; cancellation ends it silently because nobody is listening.
    pub async fn run(&self, request: SearchRequest, tx: mpsc::Sender<SearchEvent>) {
        let permit = match self.acquire_session().await {
            Some(permit) => permit,
            None => return,
        };

        let artist = request.artist_name.clone();
        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(SearchError::Cancelled),
            result = self.stream(request, &tx) => result,
        };
        drop(permit);

        match result {
            Ok(()) => {}
            Err(SearchError::Cancelled) => {
                debug!(artist = %artist, "search cancelled");
            }
            Err(e) => {
                warn!(artist = %artist, error = %e, "search failed");
                let _ = send(&tx, SearchEvent::Error {
                    message: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn acquire_session(&self) -> Option<SemaphorePermit<'_>> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            permit = self.sessions.acquire() => permit.ok(),
        }
    }

    async fn stream(
        &self,
        request: SearchRequest,
        tx: &mpsc::Sender<SearchEvent>,
    ) -> Result<(), SearchError> {
        request.validate()?;
        let target = request.target.resolve(self.settings.hard_cap);

        send(tx, SearchEvent::Start {
            total_requested: target,
        })
        .await?;

        let query = request.artist_name.trim();
        let artist = self
            .catalog
            .search_artist(query)
            .await?
            .ok_or_else(|| SearchError::ArtistNotFound(query.to_string()))?;

        let managed = self.manager.find_artist_by_external_id(&artist.id).await?;
        let local_index = match &managed {
            Some(managed) => self.manager.list_albums_with_status(managed).await?,
            None => HashMap::new(),
        };
        let source = if managed.is_some() {
            SourceMode::Local
        } else {
            SourceMode::Remote
        };

        info!(
            artist = %artist.name,
            source = %source,
            target,
            local_index = local_index.len(),
            "search routed"
        );

        send(tx, SearchEvent::ArtistStatus {
            found_locally: managed.is_some(),
            artist_name: artist.name.clone(),
            external_artist_id: artist.id.clone(),
            local_index_size: local_index.len(),
        })
        .await?;

        let mut session = StreamSession::new(
            artist.id,
            artist.name,
            local_index,
            request.categories,
            target,
            source,
        );
        match source {
            SourceMode::Local => self.stream_local(&mut session, tx).await?,
            SourceMode::Remote => self.stream_remote(&mut session, tx).await?,
        }

        send(tx, SearchEvent::Complete {
            total: session.collected(),
            source: session.source(),
        })
        .await?;
        Ok(())
    }

    /// Streams from the media manager's index without touching the catalog's
    /// release listing.
    async fn stream_local(
        &self,
        session: &mut StreamSession,
        tx: &mpsc::Sender<SearchEvent>,
    ) -> Result<(), SearchError> {
        let index = session.take_local_index();
        let mut entries: Vec<(String, AlbumStatus)> = index.into_iter().collect();
        // The index is hash-keyed; present newest releases first.
        entries.sort_by(|a, b| b.1.release_date.cmp(&a.1.release_date));

        let releases: Vec<EnrichedRelease> = entries
            .iter()
            .filter(|(_, status)| session.keeps(ReleaseType::normalize(status.primary_type.as_deref())))
            .take(session.remaining())
            .map(|(id, status)| EnrichedRelease::from_local(id, status, session.artist_name()))
            .collect();

        let total = releases.len();
        for chunk in releases.chunks(self.settings.batch_size) {
            let (batch_number, cumulative_total) = session.record_batch(chunk.len());
            send(tx, SearchEvent::Batch {
                releases: chunk.to_vec(),
                cumulative_total,
                has_more: cumulative_total < total,
                batch_number,
                source: SourceMode::Local,
            })
            .await?;
        }
        Ok(())
    }

    /// Paginates the catalog until the target is met or the source runs dry,
    /// pacing between pages. Each page never requests more than the session
    /// still needs, and a short page means the catalog has nothing further.
    async fn stream_remote(
        &self,
        session: &mut StreamSession,
        tx: &mpsc::Sender<SearchEvent>,
    ) -> Result<(), SearchError> {
        let mut offset = 0;
        loop {
            let requested = self.settings.page_size.min(session.remaining());
            let page = self
                .catalog
                .releases_by_artist(session.artist_id(), requested, offset)
                .await?;
            let end_of_data = page.len() < requested;
            offset += page.len();

            let mut batch = Vec::with_capacity(page.len());
            for release in page {
                let category = ReleaseType::normalize(release.primary_type.as_deref());
                if !session.keeps(category) {
                    continue;
                }
                let cover_url = match self.cover.lookup(&release.id).await {
                    Ok(url) => url,
                    Err(e) => {
                        debug!(release = %release.id, error = %e, "cover lookup failed");
                        None
                    }
                };
                batch.push(EnrichedRelease::from_remote(
                    release,
                    session.artist_name(),
                    cover_url,
                ));
            }

            if !batch.is_empty() {
                let (batch_number, cumulative_total) = session.record_batch(batch.len());
                let done = end_of_data || session.target_reached();
                send(tx, SearchEvent::Batch {
                    releases: batch,
                    cumulative_total,
                    has_more: !done,
                    batch_number,
                    source: SourceMode::Remote,
                })
                .await?;
                if done {
                    break;
                }
            } else if end_of_data {
                break;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(SearchError::Cancelled),
                _ = tokio::time::sleep(self.settings.pacing) => {}
            }
        }
        Ok(())
    }
}
