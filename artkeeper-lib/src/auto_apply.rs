//! Unattended queue drain: pick the best candidate for every missing slot.

use artkeeper_core::{
    ArtMap, DetailKind, LibraryItem, SessionStats, best_candidate, filter_for_policy,
};
use artkeeper_db::{ArtItemEntry, QueueEntry};
use artkeeper_scraper::FetchOptions;

use crate::error::PipelineError;
use crate::pipeline::{Pipeline, detail};
use crate::progress::PipelineProgress;
use crate::report::{ItemOutcome, RunReport, SkipReason};

impl Pipeline {
    /// Drain a session's queue, applying the top-ranked policy-eligible
    /// candidate to each missing slot.
    ///
    /// Slots filled since the scan are marked stale and left alone. Per-item
    /// failures end that entry in `error` and the run continues; only store
    /// failures abort. On cancellation the session is paused with its
    /// counters intact.
    pub async fn auto_apply(
        &self,
        session_id: i64,
        opts: FetchOptions,
        progress: &dyn Fn(PipelineProgress),
    ) -> Result<RunReport, PipelineError> {
        let (session, kinds) = self.begin_drain(session_id)?;
        let mut stats = session.stats;
        stats.auto_runs += 1;
        stats.review_mode = Some("auto".to_string());
        self.save_stats(session_id, &stats)?;

        let mut report = RunReport::new(session_id);
        let mut done = 0u64;
        progress(PipelineProgress::phase("Applying artwork", None));

        loop {
            if self.is_cancelled() {
                return self.stop_paused(session_id, &stats, report, progress);
            }
            let batch = self.next_batch(&kinds)?;
            if batch.is_empty() {
                break;
            }
            for entry in batch {
                if self.is_cancelled() {
                    return self.stop_paused(session_id, &stats, report, progress);
                }
                let mut outcome = ItemOutcome::new(entry.id, entry.kind, entry.dbid, &entry.title);
                if let Err(e) = self
                    .auto_entry(&entry, opts, &mut stats, &mut outcome)
                    .await
                {
                    if matches!(e, PipelineError::Db(_)) {
                        return Err(e);
                    }
                    if self.is_cancelled() {
                        // Interrupted mid-fetch: leave the entry pending.
                        return self.stop_paused(session_id, &stats, report, progress);
                    }
                    log::warn!("{} '{}' failed: {e}", entry.kind, entry.title);
                    stats.errors += 1;
                    outcome.error = Some(e.to_string());
                }
                self.finish_entry(&mut outcome)?;
                stats.skipped += outcome.declined_or_unavailable();
                self.save_stats(session_id, &stats)?;

                done += 1;
                progress(PipelineProgress::item(done, None, &entry.title));
                if let Some(reason) = outcome.reason() {
                    log::debug!("{} '{}': {reason}", entry.kind, entry.title);
                    progress(PipelineProgress::found(format!("{}: {reason}", entry.title)));
                }
                report.record(outcome);
            }
        }

        self.complete(session_id, &stats)?;
        progress(PipelineProgress::Completed);
        Ok(report)
    }

    async fn auto_entry(
        &self,
        entry: &QueueEntry,
        opts: FetchOptions,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<(), PipelineError> {
        let items = self.pending_art_items(entry.id)?;
        let Some(live) = self.live_item(entry)? else {
            for item in &items {
                self.skip_art_item(item, SkipReason::Removed, outcome)?;
            }
            return Ok(());
        };
        let eligible = self.split_stale(&live, items, stats, outcome)?;
        if eligible.is_empty() {
            return Ok(());
        }

        let art = self.fetcher().fetch_for_item(&live, opts).await?;
        for item in &eligible {
            self.auto_slot(entry, &live, item, &art, stats, outcome)?;
        }
        Ok(())
    }

    fn auto_slot(
        &self,
        entry: &QueueEntry,
        live: &LibraryItem,
        item: &ArtItemEntry,
        art: &ArtMap,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<(), PipelineError> {
        let candidates = art.get(&item.art_type).map(Vec::as_slice).unwrap_or_default();
        if candidates.is_empty() {
            return self.skip_art_item(item, SkipReason::NoCandidates, outcome);
        }
        let eligible = filter_for_policy(item.art_type, candidates, self.language());
        let Some(best) = best_candidate(item.art_type, &eligible, self.language()) else {
            return self.skip_art_item(item, SkipReason::Policy, outcome);
        };

        // The fetch may have taken a while; the slot could be filled by now.
        let Some(current) = self.live_item(entry)? else {
            return self.skip_art_item(item, SkipReason::Removed, outcome);
        };
        if current.has_art(item.art_type) {
            return self.mark_stale(&current, item, stats, outcome);
        }

        if self.apply(entry, item, &best.url, true, outcome)? {
            stats.applied += 1;
            stats.auto += 1;
            stats.log(
                DetailKind::ManualAuto,
                detail(
                    live.kind,
                    live.dbid,
                    &live.title,
                    Some(item.art_type),
                    Some(&best.url),
                    None,
                ),
            );
        }
        Ok(())
    }

    pub(crate) fn stop_paused(
        &self,
        session_id: i64,
        stats: &SessionStats,
        mut report: RunReport,
        progress: &dyn Fn(PipelineProgress),
    ) -> Result<RunReport, PipelineError> {
        self.pause(session_id, stats)?;
        report.paused = true;
        progress(PipelineProgress::Paused);
        Ok(report)
    }
}

#[cfg(test)]
#[path = "tests/auto_apply_tests.rs"]
mod tests;
