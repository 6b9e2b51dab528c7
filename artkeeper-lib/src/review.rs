//! Interactive queue drain.
//!
//! The same language policy as auto-apply narrows what is shown; the pick
//! is made by a [`Reviewer`], which may ask to see the unfiltered list.
//! Every slot is re-read from the library right before it is presented
//! and again before the chosen image is written.

use artkeeper_core::{
    ArtMap, ArtType, Candidate, DetailKind, LibraryItem, SessionStats, filter_for_policy,
};
use artkeeper_db::{ArtItemEntry, QueueEntry};
use artkeeper_scraper::FetchOptions;

use crate::error::PipelineError;
use crate::pipeline::{Pipeline, detail};
use crate::progress::PipelineProgress;
use crate::report::{ItemOutcome, RunReport, SkipReason};

/// What the reviewer decided for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewChoice {
    /// Apply the candidate at this index of the shown list.
    Apply(usize),
    /// Show the list without the language filter.
    ShowAll,
    /// Leave this slot empty.
    Skip,
    /// Leave this and every remaining slot of the item empty.
    SkipItem,
    /// Stop reviewing; the session is paused.
    Quit,
}

/// One slot awaiting a decision.
#[derive(Debug)]
pub struct ReviewPrompt<'a> {
    pub item: &'a LibraryItem,
    pub art_type: ArtType,
    /// Ranked candidates on offer.
    pub candidates: &'a [Candidate],
    /// Whether `candidates` is the language-filtered list.
    pub filtered: bool,
    /// Candidates hidden by the filter.
    pub hidden: usize,
}

pub trait Reviewer {
    fn choose(&mut self, prompt: &ReviewPrompt<'_>) -> ReviewChoice;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewOptions {
    pub fetch: FetchOptions,
    /// Apply without asking when the filtered list holds exactly one candidate.
    pub auto_single: bool,
}

enum SlotResult {
    Done,
    SkipRest,
    Quit,
}

impl Pipeline {
    /// Drain a session's queue, asking `reviewer` for every missing slot.
    pub async fn review(
        &self,
        session_id: i64,
        reviewer: &mut dyn Reviewer,
        opts: ReviewOptions,
        progress: &dyn Fn(PipelineProgress),
    ) -> Result<RunReport, PipelineError> {
        let (session, kinds) = self.begin_drain(session_id)?;
        let mut stats = session.stats;
        stats.review_mode = Some("manual".to_string());
        self.save_stats(session_id, &stats)?;

        let mut report = RunReport::new(session_id);
        let mut done = 0u64;
        progress(PipelineProgress::phase("Reviewing artwork", None));

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
                let quit = match self
                    .review_entry(&entry, reviewer, opts, &mut stats, &mut outcome)
                    .await
                {
                    Ok(quit) => quit,
                    Err(e @ PipelineError::Db(_)) => return Err(e),
                    Err(_) if self.is_cancelled() => {
                        return self.stop_paused(session_id, &stats, report, progress);
                    }
                    Err(e) => {
                        log::warn!("{} '{}' failed: {e}", entry.kind, entry.title);
                        stats.errors += 1;
                        outcome.error = Some(e.to_string());
                        false
                    }
                };
                if quit {
                    // Slots decided so far stay recorded; the entry stays
                    // pending so a resume picks up the rest.
                    stats.skipped += outcome.declined_or_unavailable();
                    report.record(outcome);
                    return self.stop_paused(session_id, &stats, report, progress);
                }
                self.finish_entry(&mut outcome)?;
                stats.skipped += outcome.declined_or_unavailable();
                self.save_stats(session_id, &stats)?;

                done += 1;
                progress(PipelineProgress::item(done, None, &entry.title));
                report.record(outcome);
            }
        }

        self.complete(session_id, &stats)?;
        progress(PipelineProgress::Completed);
        Ok(report)
    }

    /// Returns `true` when the reviewer asked to quit.
    async fn review_entry(
        &self,
        entry: &QueueEntry,
        reviewer: &mut dyn Reviewer,
        opts: ReviewOptions,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<bool, PipelineError> {
        let items = self.pending_art_items(entry.id)?;
        let Some(live) = self.live_item(entry)? else {
            for item in &items {
                self.skip_art_item(item, SkipReason::Removed, outcome)?;
            }
            return Ok(false);
        };
        let eligible = self.split_stale(&live, items, stats, outcome)?;
        if eligible.is_empty() {
            return Ok(false);
        }

        let art = self.fetcher().fetch_for_item(&live, opts.fetch).await?;
        let mut remaining = eligible.iter();
        while let Some(item) = remaining.next() {
            match self.review_slot(entry, item, &art, reviewer, opts, stats, outcome)? {
                SlotResult::Done => {}
                SlotResult::Quit => return Ok(true),
                SlotResult::SkipRest => {
                    for rest in remaining.by_ref() {
                        self.decline(entry, rest, stats, outcome)?;
                    }
                }
            }
        }
        Ok(false)
    }

    #[allow(clippy::too_many_arguments)]
    fn review_slot(
        &self,
        entry: &QueueEntry,
        item: &ArtItemEntry,
        art: &ArtMap,
        reviewer: &mut dyn Reviewer,
        opts: ReviewOptions,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<SlotResult, PipelineError> {
        let Some(live) = self.live_item(entry)? else {
            self.skip_art_item(item, SkipReason::Removed, outcome)?;
            return Ok(SlotResult::Done);
        };
        if live.has_art(item.art_type) {
            self.mark_stale(&live, item, stats, outcome)?;
            return Ok(SlotResult::Done);
        }

        let all: &[Candidate] = art.get(&item.art_type).map(Vec::as_slice).unwrap_or_default();
        if all.is_empty() {
            self.skip_art_item(item, SkipReason::NoCandidates, outcome)?;
            return Ok(SlotResult::Done);
        }
        let filtered = filter_for_policy(item.art_type, all, self.language());

        if opts.auto_single && filtered.len() == 1 {
            let url = filtered[0].url.clone();
            if self.apply(entry, item, &url, true, outcome)? {
                stats.auto += 1;
                stats.log(
                    DetailKind::ManualAuto,
                    detail(live.kind, live.dbid, &live.title, Some(item.art_type), Some(&url), None),
                );
            }
            return Ok(SlotResult::Done);
        }

        let mut show_all = false;
        loop {
            let shown: &[Candidate] = if show_all { all } else { &filtered };
            let prompt = ReviewPrompt {
                item: &live,
                art_type: item.art_type,
                candidates: shown,
                filtered: !show_all,
                hidden: all.len() - shown.len(),
            };
            match reviewer.choose(&prompt) {
                ReviewChoice::Apply(index) => {
                    let Some(choice) = shown.get(index) else {
                        log::warn!("Choice {index} is out of range; skipping {}", item.art_type);
                        self.decline(entry, item, stats, outcome)?;
                        return Ok(SlotResult::Done);
                    };
                    let url = choice.url.clone();
                    return self.apply_choice(entry, item, &url, stats, outcome);
                }
                ReviewChoice::ShowAll => show_all = true,
                ReviewChoice::Skip => {
                    self.decline(entry, item, stats, outcome)?;
                    return Ok(SlotResult::Done);
                }
                ReviewChoice::SkipItem => {
                    self.decline(entry, item, stats, outcome)?;
                    return Ok(SlotResult::SkipRest);
                }
                ReviewChoice::Quit => return Ok(SlotResult::Quit),
            }
        }
    }

    fn apply_choice(
        &self,
        entry: &QueueEntry,
        item: &ArtItemEntry,
        url: &str,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<SlotResult, PipelineError> {
        // The prompt may have been open for a while.
        let Some(live) = self.live_item(entry)? else {
            self.skip_art_item(item, SkipReason::Removed, outcome)?;
            return Ok(SlotResult::Done);
        };
        if live.has_art(item.art_type) {
            self.mark_stale(&live, item, stats, outcome)?;
            return Ok(SlotResult::Done);
        }
        if self.apply(entry, item, url, false, outcome)? {
            stats.applied += 1;
            stats.log(
                DetailKind::ManualApplied,
                detail(live.kind, live.dbid, &live.title, Some(item.art_type), Some(url), None),
            );
        }
        Ok(SlotResult::Done)
    }

    fn decline(
        &self,
        entry: &QueueEntry,
        item: &ArtItemEntry,
        stats: &mut SessionStats,
        outcome: &mut ItemOutcome,
    ) -> Result<(), PipelineError> {
        self.skip_art_item(item, SkipReason::Declined, outcome)?;
        stats.log(
            DetailKind::ManualSkipped,
            detail(entry.kind, entry.dbid, &entry.title, Some(item.art_type), None, None),
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/review_tests.rs"]
mod tests;
