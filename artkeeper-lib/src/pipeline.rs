//! Services shared by the scanner and the queue drains.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use artkeeper_core::{
    ArtItemStatus, ArtType, DetailEntry, DetailKind, LibraryHost, LibraryItem, MediaKind,
    QueueStatus, SessionStats,
};
use artkeeper_db::{self as db, ArtItemEntry, QueueEntry, ScanSession};
use artkeeper_scraper::{ApiKeys, MultiSourceFetcher, ScrapeError};

use crate::error::PipelineError;
use crate::library_cache::LibraryCache;
use crate::report::{ItemOutcome, SkipReason};
use crate::store::Store;

/// Queue entries read per batch when draining a session.
pub const DRAIN_BATCH_SIZE: usize = 20;

/// The store, the library and the fetcher for one run.
///
/// The fetcher reads the library through the same [`LibraryCache`], so
/// parent-show and set-member lookups are memoised for the whole run while
/// anti-clobber checks still go to the host.
pub struct Pipeline {
    store: Store,
    library: Arc<LibraryCache>,
    fetcher: MultiSourceFetcher,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(store: Store, library: Arc<LibraryCache>, fetcher: MultiSourceFetcher) -> Self {
        Self {
            store,
            library,
            fetcher,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wire real provider clients for `keys` over `host`.
    pub fn from_keys(
        store: Store,
        host: Arc<dyn LibraryHost>,
        keys: &ApiKeys,
        language: Option<&str>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, ScrapeError> {
        let library = Arc::new(LibraryCache::new(host));
        let fetcher = MultiSourceFetcher::from_keys(
            library.clone(),
            store.cache(),
            keys,
            language,
            Arc::clone(&cancel),
        )?;
        Ok(Self::new(store, library, fetcher).with_cancel(cancel))
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.fetcher = self.fetcher.with_cancel(Arc::clone(&flag));
        self.cancel = flag;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn library(&self) -> &LibraryCache {
        &self.library
    }

    pub fn fetcher(&self) -> &MultiSourceFetcher {
        &self.fetcher
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn language(&self) -> Option<&str> {
        self.fetcher.language()
    }

    /// Release the run's library memo.
    pub fn shutdown(&self) {
        self.library.shutdown();
    }

    // ── Sessions ────────────────────────────────────────────────────────

    pub fn session(&self, id: i64) -> Result<ScanSession, PipelineError> {
        self.store
            .with(|c| db::get_session(c, id))?
            .ok_or(PipelineError::SessionNotFound(id))
    }

    /// Open sessions for exactly `kinds`, newest first.
    pub fn open_sessions_for(&self, kinds: &[MediaKind]) -> Result<Vec<ScanSession>, PipelineError> {
        let wanted: std::collections::BTreeSet<MediaKind> = kinds.iter().copied().collect();
        let mut out = Vec::new();
        for session in self.store.with(db::get_open_sessions)? {
            if self.store.with(|c| db::get_session_media_types(c, session.id))? == wanted {
                out.push(session);
            }
        }
        Ok(out)
    }

    /// Reopen a session for draining. Entries that errored in an earlier
    /// run but still own pending art items go back to pending.
    pub(crate) fn begin_drain(
        &self,
        session_id: i64,
    ) -> Result<(ScanSession, Vec<MediaKind>), PipelineError> {
        let session = self.session(session_id)?;
        if session.status.is_terminal() {
            return Err(PipelineError::other(format!(
                "Session {session_id} is already {}",
                session.status
            )));
        }
        let kinds: Vec<MediaKind> = self
            .store
            .with(|c| db::get_session_media_types(c, session_id))?
            .into_iter()
            .collect();
        let restored = self.store.with(|c| {
            db::resume_session(c, session_id)?;
            db::restore_pending_queue_items(c, &kinds)
        })?;
        if restored > 0 {
            log::info!("Restored {restored} queue entries to pending");
        }
        Ok((session, kinds))
    }

    pub(crate) fn next_batch(&self, kinds: &[MediaKind]) -> Result<Vec<QueueEntry>, PipelineError> {
        Ok(self
            .store
            .with(|c| db::get_next_batch(c, DRAIN_BATCH_SIZE, kinds))?)
    }

    pub(crate) fn save_stats(&self, id: i64, stats: &SessionStats) -> Result<(), PipelineError> {
        Ok(self.store.with(|c| db::update_session_stats(c, id, stats))?)
    }

    pub(crate) fn pause(&self, id: i64, stats: &SessionStats) -> Result<(), PipelineError> {
        log::info!("Pausing session {id}");
        Ok(self.store.with(|c| db::pause_session(c, id, stats))?)
    }

    pub(crate) fn complete(&self, id: i64, stats: &SessionStats) -> Result<(), PipelineError> {
        log::info!("Session {id} drained");
        Ok(self.store.with(|c| db::complete_session(c, id, stats))?)
    }

    // ── Entries ─────────────────────────────────────────────────────────

    /// Pending art items of an entry, in priority order.
    pub(crate) fn pending_art_items(&self, queue_id: i64) -> Result<Vec<ArtItemEntry>, PipelineError> {
        let items = self.store.with(|c| db::get_art_items(c, queue_id))?;
        Ok(items
            .into_iter()
            .filter(|i| i.status == ArtItemStatus::Pending)
            .collect())
    }

    /// Live item state straight from the host.
    pub(crate) fn live_item(&self, entry: &QueueEntry) -> Result<Option<LibraryItem>, PipelineError> {
        Ok(self.library.get_fresh(entry.kind, entry.dbid)?)
    }

    /// Mark art items whose slot is already filled as stale. Returns the
    /// items still eligible.
    pub(crate) fn split_stale(
        &self,
        live: &LibraryItem,
        items: Vec<ArtItemEntry>,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<Vec<ArtItemEntry>, PipelineError> {
        let mut eligible = Vec::with_capacity(items.len());
        for item in items {
            if live.has_art(item.art_type) {
                self.mark_stale(live, &item, stats, outcome)?;
            } else {
                eligible.push(item);
            }
        }
        Ok(eligible)
    }

    pub(crate) fn mark_stale(
        &self,
        live: &LibraryItem,
        item: &ArtItemEntry,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<(), PipelineError> {
        log::debug!(
            "{} '{}' already has {}; marking stale",
            live.kind,
            live.title,
            item.art_type
        );
        self.store
            .with(|c| db::update_art_item_status(c, item.id, ArtItemStatus::Stale))?;
        stats.stale += 1;
        stats.log(
            DetailKind::Stale,
            detail(live.kind, live.dbid, &live.title, Some(item.art_type), None, None),
        );
        outcome.skipped.push((item.art_type, SkipReason::Stale));
        Ok(())
    }

    pub(crate) fn skip_art_item(
        &self,
        item: &ArtItemEntry,
        reason: SkipReason,
        outcome: &mut ItemOutcome,
    ) -> Result<(), PipelineError> {
        self.store
            .with(|c| db::update_art_item_status(c, item.id, ArtItemStatus::Skipped))?;
        outcome.skipped.push((item.art_type, reason));
        Ok(())
    }

    /// Write one slot to the library and record it on the art item.
    ///
    /// Returns `false` when the host declined the write; the art item then
    /// stays pending.
    pub(crate) fn apply(
        &self,
        entry: &QueueEntry,
        item: &ArtItemEntry,
        url: &str,
        auto: bool,
        outcome: &mut ItemOutcome,
    ) -> Result<bool, PipelineError> {
        let mut art = BTreeMap::new();
        art.insert(item.art_type, url.to_string());
        if !self.library.set_artwork(entry.kind, entry.dbid, &art)? {
            log::warn!(
                "Library declined {} for {} {}",
                item.art_type,
                entry.kind,
                entry.dbid
            );
            return Ok(false);
        }
        self.store
            .with(|c| db::update_art_item(c, item.id, url, auto))?;
        outcome.applied.push((item.art_type, url.to_string()));
        Ok(true)
    }

    /// Settle an entry's status from what happened to its art items.
    pub(crate) fn finish_entry(&self, outcome: &mut ItemOutcome) -> Result<(), PipelineError> {
        outcome.status = if outcome.error.is_some() {
            QueueStatus::Error
        } else if outcome.applied.is_empty() {
            QueueStatus::Skipped
        } else {
            QueueStatus::Completed
        };
        self.store
            .with(|c| db::update_queue_status(c, outcome.queue_id, outcome.status))?;
        Ok(())
    }
}

pub(crate) fn detail(
    kind: MediaKind,
    dbid: i64,
    title: &str,
    art_type: Option<ArtType>,
    url: Option<&str>,
    reason: Option<&str>,
) -> DetailEntry {
    DetailEntry {
        title: title.to_string(),
        kind,
        dbid,
        art_type,
        url: url.map(str::to_string),
        reason: reason.map(str::to_string),
    }
}
