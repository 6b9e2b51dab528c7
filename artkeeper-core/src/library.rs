//! Contract with the host media library.
//!
//! The host owns the catalogue; this crate only reads item metadata and
//! writes chosen artwork URLs back. Everything behind [`LibraryHost`] is
//! an external collaborator.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::art::ArtType;
use crate::media::MediaKind;

/// External identifiers attached to a library item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    /// MusicBrainz artist id (artists) or album-artist id (albums).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_artist: Option<String>,
    /// MusicBrainz release group id (albums).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_release_group: Option<String>,
}

/// One item as reported by the host library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub kind: MediaKind,
    pub dbid: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// Premiere / first-aired / release date.
    #[serde(default)]
    pub premiered: Option<NaiveDate>,
    #[serde(default)]
    pub ids: ExternalIds,
    /// Current artwork slots. A slot with an empty URL counts as missing.
    #[serde(default)]
    pub art: BTreeMap<ArtType, String>,
    /// Owning TV show for seasons and episodes.
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    /// Movie set membership (movies only).
    #[serde(default)]
    pub set_id: Option<i64>,
    /// Display artist (albums).
    #[serde(default)]
    pub artist: Option<String>,
}

impl LibraryItem {
    pub fn new(kind: MediaKind, dbid: i64, title: impl Into<String>) -> Self {
        Self {
            kind,
            dbid,
            title: title.into(),
            year: None,
            premiered: None,
            ids: ExternalIds::default(),
            art: BTreeMap::new(),
            parent_id: None,
            season: None,
            episode: None,
            set_id: None,
            artist: None,
        }
    }

    /// Whether the slot currently holds artwork.
    pub fn has_art(&self, art_type: ArtType) -> bool {
        self.art.get(&art_type).is_some_and(|url| !url.trim().is_empty())
    }

    /// Requested art types this item is missing, in priority order.
    pub fn missing_art(&self, required: &[ArtType]) -> Vec<ArtType> {
        let mut missing: Vec<ArtType> = required
            .iter()
            .copied()
            .filter(|t| !self.has_art(*t))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

/// Errors reported by a library host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("library item not found: {kind} {dbid}")]
    NotFound { kind: MediaKind, dbid: i64 },

    #[error("library unavailable: {0}")]
    Unavailable(String),

    #[error("library write rejected: {0}")]
    Rejected(String),
}

impl HostError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Query/update interface of the host library.
///
/// Implementations must be cheap to call repeatedly: the scanner and the
/// review loop query one item at a time.
pub trait LibraryHost: Send + Sync {
    /// Read one item with its ids and current artwork. `Ok(None)` when the
    /// item no longer exists.
    fn get_item(&self, kind: MediaKind, dbid: i64) -> Result<Option<LibraryItem>, HostError>;

    /// Enumerate every item of a kind.
    fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>, HostError>;

    /// Write artwork slots back. Idempotent; returns whether the host
    /// accepted the update.
    fn set_artwork(
        &self,
        kind: MediaKind,
        dbid: i64,
        art: &BTreeMap<ArtType, String>,
    ) -> Result<bool, HostError>;

    /// Movies belonging to a set, in library order.
    fn set_members(&self, set_dbid: i64) -> Result<Vec<LibraryItem>, HostError> {
        Ok(self
            .list_items(MediaKind::Movie)?
            .into_iter()
            .filter(|m| m.set_id == Some(set_dbid))
            .collect())
    }
}
