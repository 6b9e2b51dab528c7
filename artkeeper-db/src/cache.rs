//! Provider artwork cache rows.
//!
//! Each row holds one provider's candidate list for one (item, art type),
//! with its own expiry. A separate marker row records that a complete
//! multi-provider fetch finished for an item; readers must check it before
//! trusting the per-type rows.

use artkeeper_core::{ArtMap, ArtType, Candidate, MediaKind, Provider};
use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::DbError;
use crate::format_ts;

/// Art-type column value of the completion marker row.
pub const FULL_FETCH_MARKER: &str = "_full_fetch_complete";


/// Summary counts for `cache stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub rows: u64,
    pub expired: u64,
    pub complete_items: u64,
}

/// Store (or replace) one provider's candidates for an item and art type.
#[allow(clippy::too_many_arguments)]
pub fn cache_artwork(
    conn: &Connection,
    kind: MediaKind,
    media_id: &str,
    source: Provider,
    art_type: ArtType,
    candidates: &[Candidate],
    release_date: Option<NaiveDate>,
    ttl: Duration,
) -> Result<(), DbError> {
    let data = serde_json::to_string(candidates)?;
    write_row(
        conn,
        kind,
        media_id,
        source,
        art_type.as_str(),
        &data,
        release_date,
        ttl,
    )
}

/// Record that a full fetch across every provider finished for an item.
///
/// Must be written after all per-type rows. `providers` lists the sources
/// that answered; a later reader configured with more sources treats the
/// item as incomplete.
pub fn mark_full_fetch(
    conn: &Connection,
    kind: MediaKind,
    media_id: &str,
    providers: &[Provider],
    release_date: Option<NaiveDate>,
    ttl: Duration,
) -> Result<(), DbError> {
    let payload = serde_json::to_string(&serde_json::json!({ "providers": providers }))?;
    write_row(
        conn,
        kind,
        media_id,
        Provider::System,
        FULL_FETCH_MARKER,
        &payload,
        release_date,
        ttl,
    )
}

#[allow(clippy::too_many_arguments)]
fn write_row(
    conn: &Connection,
    kind: MediaKind,
    media_id: &str,
    source: Provider,
    art_type: &str,
    data: &str,
    release_date: Option<NaiveDate>,
    ttl: Duration,
) -> Result<(), DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO artwork_cache (media_type, media_id, source, art_type, data, release_date, cached_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(media_type, media_id, source, art_type) DO UPDATE SET
             data = excluded.data,
             release_date = excluded.release_date,
             cached_at = excluded.cached_at,
             expires_at = excluded.expires_at",
        params![
            kind.short_name(),
            media_id,
            source.cache_key(),
            art_type,
            data,
            release_date.map(|d| d.to_string()),
            format_ts(now),
            format_ts(now + ttl),
        ],
    )?;
    Ok(())
}

/// Whether an unexpired completion marker exists for the item.
pub fn has_full_fetch_marker(
    conn: &Connection,
    kind: MediaKind,
    media_id: &str,
) -> Result<bool, DbError> {
    let result = conn.query_row(
        "SELECT id FROM artwork_cache
         WHERE media_type = ?1 AND media_id = ?2 AND source = ?3 AND art_type = ?4
           AND expires_at > ?5",
        params![
            kind.short_name(),
            media_id,
            Provider::System.cache_key(),
            FULL_FETCH_MARKER,
            format_ts(Utc::now()),
        ],
        |row| row.get::<_, i64>(0),
    );
    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Providers recorded by an unexpired completion marker, or `None` when the
/// item has no marker. A marker without a provider list yields an empty list.
pub fn full_fetch_providers(
    conn: &Connection,
    kind: MediaKind,
    media_id: &str,
) -> Result<Option<Vec<Provider>>, DbError> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM artwork_cache
             WHERE media_type = ?1 AND media_id = ?2 AND source = ?3 AND art_type = ?4
               AND expires_at > ?5",
            params![
                kind.short_name(),
                media_id,
                Provider::System.cache_key(),
                FULL_FETCH_MARKER,
                format_ts(Utc::now()),
            ],
            |row| row.get(0),
        )
        .optional()?;
    let Some(data) = data else {
        return Ok(None);
    };
    let payload: serde_json::Value = serde_json::from_str(&data)?;
    let providers = match payload.get("providers") {
        Some(list) => serde_json::from_value(list.clone())?,
        None => Vec::new(),
    };
    Ok(Some(providers))
}

/// Read one unexpired cache row. `Ok(None)` is a miss.
pub fn get_cached_artwork(
    conn: &Connection,
    kind: MediaKind,
    media_id: &str,
    source: Provider,
    art_type: ArtType,
) -> Result<Option<Vec<Candidate>>, DbError> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM artwork_cache
             WHERE media_type = ?1 AND media_id = ?2 AND source = ?3 AND art_type = ?4
               AND expires_at > ?5",
            params![
                kind.short_name(),
                media_id,
                source.cache_key(),
                art_type.as_str(),
                format_ts(Utc::now()),
            ],
            |row| row.get(0),
        )
        .optional()?;
    match data {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Load and merge unexpired rows for several providers and art types at once.
///
/// `sources` pairs each provider with the id it caches this item under
/// (providers key items differently). Lists are concatenated in `sources`
/// order; art types with no rows are absent from the result.
pub fn get_cached_artwork_batch(
    conn: &Connection,
    kind: MediaKind,
    sources: &[(Provider, &str)],
    art_types: &[ArtType],
) -> Result<ArtMap, DbError> {
    let now = format_ts(Utc::now());
    let mut stmt = conn.prepare_cached(
        "SELECT art_type, data FROM artwork_cache
         WHERE media_type = ?1 AND media_id = ?2 AND source = ?3 AND expires_at > ?4",
    )?;

    let mut merged = ArtMap::new();
    for (source, media_id) in sources {
        let rows = stmt.query_map(
            params![kind.short_name(), media_id, source.cache_key(), now],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;
        for row in rows {
            let (art_type, data) = row?;
            let Ok(art_type) = art_type.parse::<ArtType>() else {
                continue;
            };
            if !art_types.contains(&art_type) {
                continue;
            }
            let candidates: Vec<Candidate> = serde_json::from_str(&data)?;
            merged.entry(art_type).or_default().extend(candidates);
        }
    }
    Ok(merged)
}

/// Delete expired rows. Returns the number removed.
pub fn clear_expired_cache(conn: &Connection) -> Result<usize, DbError> {
    let removed = conn.execute(
        "DELETE FROM artwork_cache WHERE expires_at <= ?1",
        [format_ts(Utc::now())],
    )?;
    if removed > 0 {
        log::debug!("Removed {removed} expired cache rows");
    }
    Ok(removed)
}

/// Delete every cached row for one item (all providers, marker included).
pub fn clear_cache_for_item(
    conn: &Connection,
    kind: MediaKind,
    media_ids: &[&str],
) -> Result<usize, DbError> {
    let mut removed = 0;
    for media_id in media_ids {
        removed += conn.execute(
            "DELETE FROM artwork_cache WHERE media_type = ?1 AND media_id = ?2",
            params![kind.short_name(), media_id],
        )?;
    }
    Ok(removed)
}

/// Delete the whole cache. Returns the number of rows removed.
pub fn clear_cache(conn: &Connection) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM artwork_cache", [])?)
}

pub fn cache_stats(conn: &Connection) -> Result<CacheStats, DbError> {
    let now = format_ts(Utc::now());
    let (rows, expired, complete_items) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN expires_at <= ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN art_type = ?2 AND expires_at > ?1 THEN 1 ELSE 0 END), 0)
         FROM artwork_cache",
        params![now, FULL_FETCH_MARKER],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
    )?;
    Ok(CacheStats {
        rows: rows as u64,
        expired: expired as u64,
        complete_items: complete_items as u64,
    })
}
