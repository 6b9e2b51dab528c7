//! SQLite persistence for the artwork pipeline.
//!
//! Provides schema creation plus free-function operations over a
//! `rusqlite::Connection`: the provider artwork cache, stale-id mappings,
//! the review queue and scan sessions.

pub mod cache;
pub mod error;
pub mod mappings;
pub mod queue;
pub mod schema;
pub mod sessions;

use chrono::{DateTime, Utc};

pub use cache::{
    CacheStats, FULL_FETCH_MARKER, cache_artwork, cache_stats, clear_cache, clear_cache_for_item,
    clear_expired_cache, full_fetch_providers, get_cached_artwork, get_cached_artwork_batch,
    has_full_fetch_marker, mark_full_fetch,
};
pub use error::DbError;
pub use mappings::{
    ID_MAPPING_TTL_DAYS, MB_RELEASE_GROUP, TMDB_COLLECTION, canonical_for_old,
    old_ids_for_canonical, prune_id_mappings, save_id_mapping,
};
pub use queue::{
    ArtItemEntry, NewQueueEntry, QueueEntry, QueueStats, add_art_items, add_to_queue,
    cleanup_old_queue_items, clear_queue_for_media, count_queue_items,
    get_art_items, get_art_items_for_queue_batch, get_next_batch, get_queue_breakdown,
    get_queue_entry, get_queue_stats, prune_inactive_queue_items, queue_missing_batch,
    restore_pending_queue_items, update_art_item, update_art_item_status, update_queue_status,
};
pub use schema::{open_database, open_memory};
pub use sessions::{
    ScanSession, cancel_session, complete_session, create_scan_session, find_resumable_session,
    get_open_sessions, get_paused_sessions, get_session, get_session_art_types,
    get_session_media_types, pause_session, resume_session, update_session_stats,
};

/// Timestamp format used in every TEXT time column. Lexical order matches
/// chronological order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
