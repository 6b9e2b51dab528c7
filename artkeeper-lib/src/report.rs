//! Outcome records for auto-apply and review runs.

use std::collections::BTreeMap;
use std::fmt;

use artkeeper_core::{ArtType, MediaKind, QueueStatus};

/// Why an art item was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// No provider offered anything for this art type.
    NoCandidates,
    /// Candidates existed but the language policy removed all of them.
    Policy,
    /// The slot was filled since the scan ran.
    Stale,
    /// A human declined.
    Declined,
    /// The item is gone from the library.
    Removed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCandidates => "no artwork available",
            Self::Policy => "blocked by language policy",
            Self::Stale => "already set",
            Self::Declined => "skipped by user",
            Self::Removed => "no longer in library",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one queue entry in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub queue_id: i64,
    pub kind: MediaKind,
    pub dbid: i64,
    pub title: String,
    pub status: QueueStatus,
    pub applied: Vec<(ArtType, String)>,
    pub skipped: Vec<(ArtType, SkipReason)>,
    /// Error message for entries that ended in `error`.
    pub error: Option<String>,
}

impl ItemOutcome {
    pub(crate) fn new(queue_id: i64, kind: MediaKind, dbid: i64, title: &str) -> Self {
        Self {
            queue_id,
            kind,
            dbid,
            title: title.to_string(),
            status: QueueStatus::Pending,
            applied: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }

    /// Art items skipped for any reason other than staleness.
    pub fn declined_or_unavailable(&self) -> u64 {
        self.skipped
            .iter()
            .filter(|(_, r)| *r != SkipReason::Stale)
            .count() as u64
    }

    /// One-line reason for an entry that applied nothing.
    pub fn reason(&self) -> Option<String> {
        if let Some(e) = &self.error {
            return Some(e.clone());
        }
        if !self.applied.is_empty() {
            return None;
        }
        let mut reasons: Vec<SkipReason> = self.skipped.iter().map(|(_, r)| *r).collect();
        reasons.sort();
        reasons.dedup();
        match reasons.as_slice() {
            [] => None,
            [only] => Some(only.to_string()),
            many => Some(
                many.iter()
                    .map(SkipReason::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }
}

/// End-of-run totals, counted per art item except where noted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub session_id: i64,
    pub applied: u64,
    pub skipped_no_candidates: u64,
    pub skipped_policy: u64,
    pub declined: u64,
    pub stale: u64,
    /// Queue entries that ended in `error`.
    pub errors: u64,
    pub entries_completed: u64,
    pub entries_skipped: u64,
    /// The run stopped early and its session was paused.
    pub paused: bool,
    pub items: Vec<ItemOutcome>,
}

impl RunReport {
    pub(crate) fn new(session_id: i64) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        self.applied += outcome.applied.len() as u64;
        for (_, reason) in &outcome.skipped {
            match reason {
                SkipReason::NoCandidates | SkipReason::Removed => self.skipped_no_candidates += 1,
                SkipReason::Policy => self.skipped_policy += 1,
                SkipReason::Stale => self.stale += 1,
                SkipReason::Declined => self.declined += 1,
            }
        }
        match outcome.status {
            QueueStatus::Completed => self.entries_completed += 1,
            QueueStatus::Skipped => self.entries_skipped += 1,
            QueueStatus::Error => self.errors += 1,
            QueueStatus::Pending => {}
        }
        self.items.push(outcome);
    }

    pub fn entries(&self) -> usize {
        self.items.len()
    }

    /// Counts per skip reason, for summaries.
    pub fn skip_breakdown(&self) -> BTreeMap<SkipReason, u64> {
        let mut out = BTreeMap::new();
        for item in &self.items {
            for (_, reason) in &item.skipped {
                *out.entry(*reason).or_insert(0) += 1;
            }
        }
        out
    }
}
