//! Typed scan-session statistics.
//!
//! Sessions persist their counters so a paused run resumes with exact
//! totals. The store serialises this struct as JSON; everything else
//! works with the typed form.

use serde::{Deserialize, Serialize};

use crate::art::ArtType;
use crate::media::MediaKind;

/// Current schema version of [`SessionStats`].
pub const STATS_VERSION: u32 = 1;

/// Maximum entries kept per detail list.
pub const MAX_DETAIL_ITEMS: usize = 200;

/// One line of the per-session review log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub title: String,
    pub kind: MediaKind,
    pub dbid: i64,
    pub art_type: Option<ArtType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Which detail list an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    ManualApplied,
    ManualSkipped,
    ManualAuto,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetails {
    #[serde(default)]
    pub manual_applied: Vec<DetailEntry>,
    #[serde(default)]
    pub manual_skipped: Vec<DetailEntry>,
    #[serde(default)]
    pub manual_auto: Vec<DetailEntry>,
    #[serde(default)]
    pub stale: Vec<DetailEntry>,
}

impl SessionDetails {
    fn list_mut(&mut self, kind: DetailKind) -> &mut Vec<DetailEntry> {
        match kind {
            DetailKind::ManualApplied => &mut self.manual_applied,
            DetailKind::ManualSkipped => &mut self.manual_skipped,
            DetailKind::ManualAuto => &mut self.manual_auto,
            DetailKind::Stale => &mut self.stale,
        }
    }
}

/// Counters and review log for one scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub scanned: u64,
    #[serde(default)]
    pub queued: u64,
    #[serde(default)]
    pub applied: u64,
    #[serde(default)]
    pub skipped: u64,
    /// Items finished without a human choice (nothing to choose from).
    #[serde(default)]
    pub auto: u64,
    #[serde(default)]
    pub stale: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub auto_runs: u64,
    #[serde(default)]
    pub review_mode: Option<String>,
    #[serde(default)]
    pub details: SessionDetails,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            version: STATS_VERSION,
            scanned: 0,
            queued: 0,
            applied: 0,
            skipped: 0,
            auto: 0,
            stale: 0,
            errors: 0,
            auto_runs: 0,
            review_mode: None,
            details: SessionDetails::default(),
        }
    }
}

impl SessionStats {
    /// Append to a detail list, dropping the oldest entry past the cap.
    pub fn log(&mut self, kind: DetailKind, entry: DetailEntry) {
        let list = self.details.list_mut(kind);
        list.push(entry);
        if list.len() > MAX_DETAIL_ITEMS {
            let excess = list.len() - MAX_DETAIL_ITEMS;
            list.drain(..excess);
        }
    }

    /// Parse a persisted stats blob, upgrading older versions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut stats: SessionStats = serde_json::from_str(json)?;
        if stats.version < STATS_VERSION {
            stats.version = STATS_VERSION;
        }
        Ok(stats)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: i64) -> DetailEntry {
        DetailEntry {
            title: format!("Item {n}"),
            kind: MediaKind::Movie,
            dbid: n,
            art_type: Some(ArtType::Poster),
            url: None,
            reason: None,
        }
    }

    #[test]
    fn detail_lists_are_capped() {
        let mut stats = SessionStats::default();
        for n in 0..(MAX_DETAIL_ITEMS as i64 + 5) {
            stats.log(DetailKind::Stale, entry(n));
        }
        assert_eq!(stats.details.stale.len(), MAX_DETAIL_ITEMS);
        assert_eq!(stats.details.stale[0].dbid, 5);
    }

    #[test]
    fn missing_fields_default_on_load() {
        let stats = SessionStats::from_json(r#"{"version":0,"applied":4}"#).unwrap();
        assert_eq!(stats.version, STATS_VERSION);
        assert_eq!(stats.applied, 4);
        assert_eq!(stats.skipped, 0);
        assert!(stats.details.manual_applied.is_empty());
    }
}
