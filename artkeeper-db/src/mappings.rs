//! Provider id aliases.
//!
//! Some providers key data under a superseded identifier (a merged
//! MusicBrainz release group, for instance). Once discovered, the
//! old -> canonical pairing is remembered so later fetches can retry under
//! the old id without searching again.

use chrono::{Duration, Utc};
use rusqlite::{Connection, params};

use crate::error::DbError;
use crate::format_ts;

/// Namespace for MusicBrainz release-group aliases.
pub const MB_RELEASE_GROUP: &str = "mb_release_group";

/// Namespace for movie-set -> TMDB collection lookups. The "old" id is the
/// set's cache key, the canonical id is the collection id.
pub const TMDB_COLLECTION: &str = "tmdb_collection";

/// Mappings older than this are ignored and revalidated by search.
pub const ID_MAPPING_TTL_DAYS: i64 = 90;

/// Record (or refresh) an alias.
pub fn save_id_mapping(
    conn: &Connection,
    namespace: &str,
    old_id: &str,
    canonical_id: &str,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO id_mappings (namespace, old_id, canonical_id, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(namespace, old_id) DO UPDATE SET
             canonical_id = excluded.canonical_id,
             created_at = excluded.created_at",
        params![namespace, old_id, canonical_id, format_ts(Utc::now())],
    )?;
    log::debug!("Saved {namespace} mapping {old_id} -> {canonical_id}");
    Ok(())
}

/// Known old ids for a canonical id, newest first. Mappings older than
/// [`ID_MAPPING_TTL_DAYS`] are not returned.
pub fn old_ids_for_canonical(
    conn: &Connection,
    namespace: &str,
    canonical_id: &str,
) -> Result<Vec<String>, DbError> {
    let cutoff = format_ts(Utc::now() - Duration::days(ID_MAPPING_TTL_DAYS));
    let mut stmt = conn.prepare_cached(
        "SELECT old_id FROM id_mappings
         WHERE namespace = ?1 AND canonical_id = ?2 AND created_at > ?3
         ORDER BY created_at DESC",
    )?;
    let ids = stmt
        .query_map(params![namespace, canonical_id, cutoff], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Canonical id recorded for an old id, if still fresh.
pub fn canonical_for_old(
    conn: &Connection,
    namespace: &str,
    old_id: &str,
) -> Result<Option<String>, DbError> {
    let cutoff = format_ts(Utc::now() - Duration::days(ID_MAPPING_TTL_DAYS));
    let result = conn.query_row(
        "SELECT canonical_id FROM id_mappings
         WHERE namespace = ?1 AND old_id = ?2 AND created_at > ?3",
        params![namespace, old_id, cutoff],
        |row| row.get(0),
    );
    match result {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Drop expired aliases. Returns the number removed.
pub fn prune_id_mappings(conn: &Connection) -> Result<usize, DbError> {
    let cutoff = format_ts(Utc::now() - Duration::days(ID_MAPPING_TTL_DAYS));
    Ok(conn.execute(
        "DELETE FROM id_mappings WHERE created_at <= ?1",
        [cutoff],
    )?)
}
