//! Domain types shared by every artkeeper crate.
//!
//! Nothing here performs I/O: media kinds, art types, candidates, the
//! library host contract, language policy, ranking, and typed session
//! statistics.

pub mod art;
pub mod language;
pub mod library;
pub mod media;
pub mod ranking;
pub mod state;
pub mod stats;
pub mod util;

pub use art::{ArtMap, ArtType, ArtTypeParseError, Candidate, Provider, merge_art};
pub use language::{LanguageRule, filter_for_policy, normalize_language_tag};
pub use library::{ExternalIds, HostError, LibraryHost, LibraryItem};
pub use media::{MediaKind, MediaKindParseError, ScanScope};
pub use ranking::{best_candidate, popularity_score, rank_art_map, sort_candidates};
pub use state::{ArtItemStatus, QueueStatus, ReviewMode, ScanType, SessionStatus};
pub use stats::{DetailEntry, DetailKind, SessionStats};
