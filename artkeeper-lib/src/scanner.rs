//! Library scanner: find items missing artwork and queue them.
//!
//! A scan walks every item of each media kind in scope, compares the
//! item's artwork slots against the art types required for its kind and
//! queues one entry (plus one art item per missing type) for each item
//! that lacks something. Work is attached to a scan session; an open
//! session for the same scope is reused instead of starting a new one.

use std::collections::{BTreeMap, BTreeSet};

use artkeeper_core::{ArtType, LibraryHost, MediaKind, ScanType, SessionStats};
use artkeeper_db::{self as db, NewQueueEntry};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::progress::PipelineProgress;

/// Queue entries written per transaction.
pub const SCAN_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub scan_type: ScanType,
    /// Art types to require instead of each kind's defaults. Types a kind
    /// never carries are ignored.
    pub art_types: Option<Vec<ArtType>>,
    /// Free-form label stored on each queue entry (e.g. "movies").
    pub scope_label: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scan_type: ScanType::MissingArt,
            art_types: None,
            scope_label: None,
        }
    }
}

impl ScanOptions {
    /// Art types required for `kind`, in priority order.
    pub fn required_for(&self, kind: MediaKind) -> Vec<ArtType> {
        let defaults = kind.default_art_types();
        let mut types: Vec<ArtType> = match &self.art_types {
            Some(wanted) => defaults.iter().copied().filter(|t| wanted.contains(t)).collect(),
            None => defaults.to_vec(),
        };
        types.sort();
        types
    }

    fn all_required(&self, kinds: &[MediaKind]) -> Vec<ArtType> {
        let set: BTreeSet<ArtType> = kinds.iter().flat_map(|k| self.required_for(*k)).collect();
        set.into_iter().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub session_id: i64,
    /// An open session for this scope was reused.
    pub resumed: bool,
    pub scanned: u64,
    /// Entries queued by this scan.
    pub queued: u64,
    pub art_items: u64,
    pub per_kind: BTreeMap<MediaKind, u64>,
    /// The scan stopped early; its session was paused.
    pub cancelled: bool,
}

impl Pipeline {
    /// Scan `kinds` and queue every item that is missing artwork.
    ///
    /// When the scan finishes with queued work its session is left paused,
    /// ready for `auto_apply` or `review`; a scan that queued nothing
    /// completes its session.
    pub fn scan(
        &self,
        kinds: &[MediaKind],
        opts: &ScanOptions,
        progress: &dyn Fn(PipelineProgress),
    ) -> Result<ScanSummary, PipelineError> {
        let art_types = opts.all_required(kinds);
        let existing = self
            .store()
            .with(|c| db::find_resumable_session(c, opts.scan_type, kinds))?;

        let (session_id, mut stats, resumed) = match existing {
            Some(session) => {
                log::info!("Resuming {} session {}", session.scan_type, session.id);
                self.store().with(|c| db::resume_session(c, session.id))?;
                (session.id, session.stats, true)
            }
            None => {
                let id = self
                    .store()
                    .with(|c| db::create_scan_session(c, opts.scan_type, kinds, &art_types))?;
                log::info!("Started {} session {id}", opts.scan_type);
                (id, SessionStats::default(), false)
            }
        };

        self.store().with(|c| db::prune_inactive_queue_items(c, kinds))?;

        let mut summary = ScanSummary {
            session_id,
            resumed,
            ..ScanSummary::default()
        };
        let mut batch: Vec<NewQueueEntry> = Vec::with_capacity(SCAN_BATCH_SIZE);

        'kinds: for kind in kinds {
            let required = opts.required_for(*kind);
            if required.is_empty() {
                continue;
            }
            let items = self.library().list_items(*kind)?;
            let total = items.len() as u64;
            progress(PipelineProgress::phase(kind.display_name(), Some(total)));
            log::debug!("Scanning {total} {kind} items");

            for (n, item) in items.iter().enumerate() {
                if self.is_cancelled() {
                    summary.cancelled = true;
                    break 'kinds;
                }
                summary.scanned += 1;
                stats.scanned += 1;

                let missing = item.missing_art(&required);
                if !missing.is_empty() {
                    summary.art_items += missing.len() as u64;
                    *summary.per_kind.entry(*kind).or_insert(0) += 1;
                    batch.push(NewQueueEntry {
                        kind: *kind,
                        dbid: item.dbid,
                        title: item.title.clone(),
                        year: item.year,
                        scope: opts.scope_label.clone(),
                        art_types: missing,
                    });
                    if batch.len() >= SCAN_BATCH_SIZE {
                        self.flush(&mut batch, session_id, &mut summary, &mut stats)?;
                    }
                }
                progress(PipelineProgress::item(n as u64 + 1, Some(total), &item.title));
            }
        }
        self.flush(&mut batch, session_id, &mut summary, &mut stats)?;

        if summary.cancelled {
            self.pause(session_id, &stats)?;
            progress(PipelineProgress::Paused);
            return Ok(summary);
        }

        let pending = self
            .store()
            .with(|c| db::count_queue_items(c, Some(artkeeper_core::QueueStatus::Pending), kinds))?;
        if pending == 0 {
            self.complete(session_id, &stats)?;
        } else {
            self.pause(session_id, &stats)?;
        }
        log::info!(
            "Scan finished: {} scanned, {} queued ({} art items)",
            summary.scanned,
            summary.queued,
            summary.art_items
        );
        progress(PipelineProgress::Completed);
        Ok(summary)
    }

    fn flush(
        &self,
        batch: &mut Vec<NewQueueEntry>,
        session_id: i64,
        summary: &mut ScanSummary,
        stats: &mut SessionStats,
    ) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }
        let ids = self
            .store()
            .with(|c| db::queue_missing_batch(c, batch, Some(session_id)))?;
        summary.queued += ids.len() as u64;
        stats.queued += ids.len() as u64;
        batch.clear();
        self.save_stats(session_id, stats)
    }
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
