//! Durable work queue: one entry per library item, one art item per
//! missing art type.

use std::collections::HashMap;

use artkeeper_core::{ArtItemStatus, ArtType, MediaKind, QueueStatus, ReviewMode};
use chrono::{Duration, Utc};
use rusqlite::{Connection, Row, params, params_from_iter, types::Value};

use crate::error::DbError;
use crate::format_ts;

/// Default priority for scanner-created entries. Lower runs first.
pub const DEFAULT_PRIORITY: i32 = 5;

/// A library item awaiting artwork.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    pub kind: MediaKind,
    pub dbid: i64,
    pub title: String,
    pub year: Option<i32>,
    pub status: QueueStatus,
    pub priority: i32,
    pub scope: Option<String>,
    pub scan_session_id: Option<i64>,
    pub guid: String,
    pub date_added: String,
    pub date_processed: Option<String>,
}

/// One requested art type of a queue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtItemEntry {
    pub id: i64,
    pub queue_id: i64,
    pub art_type: ArtType,
    pub review_mode: ReviewMode,
    pub status: ArtItemStatus,
    pub auto_applied: bool,
    pub applied_url: Option<String>,
    pub scan_session_id: Option<i64>,
    pub date_processed: Option<String>,
}

/// Input for queueing one item with its missing art types.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub kind: MediaKind,
    pub dbid: i64,
    pub title: String,
    pub year: Option<i32>,
    pub scope: Option<String>,
    pub art_types: Vec<ArtType>,
}

/// Queue entry counts grouped by status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub completed: u64,
    pub skipped: u64,
    pub error: u64,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.pending + self.completed + self.skipped + self.error
    }
}

// ── Insertion ───────────────────────────────────────────────────────────────

/// Insert a queue entry or reset an existing one for the same item back to
/// pending. Returns the entry id. The guid of an existing entry is kept.
pub fn add_to_queue(
    conn: &Connection,
    kind: MediaKind,
    dbid: i64,
    title: &str,
    year: Option<i32>,
    scope: Option<&str>,
    session_id: Option<i64>,
) -> Result<i64, DbError> {
    let id = conn.query_row(
        "INSERT INTO art_queue (media_type, dbid, title, year, status, priority, scope, scan_session_id, guid, date_added)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(media_type, dbid) DO UPDATE SET
             title = excluded.title,
             year = excluded.year,
             status = 'pending',
             date_processed = NULL,
             scope = COALESCE(excluded.scope, art_queue.scope),
             scan_session_id = COALESCE(excluded.scan_session_id, art_queue.scan_session_id)
         RETURNING id",
        params![
            kind.short_name(),
            dbid,
            title,
            year,
            DEFAULT_PRIORITY,
            scope,
            session_id,
            uuid::Uuid::new_v4().to_string(),
            format_ts(Utc::now()),
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Insert pending art items for a queue entry. Existing rows for the same
/// art type are reset to pending (their applied url is cleared).
pub fn add_art_items(
    conn: &Connection,
    queue_id: i64,
    art_types: &[ArtType],
    session_id: Option<i64>,
) -> Result<(), DbError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO art_items (queue_id, art_type, review_mode, status, scan_session_id)
         VALUES (?1, ?2, ?3, 'pending', ?4)
         ON CONFLICT(queue_id, art_type) DO UPDATE SET
             status = 'pending',
             auto_applied = 0,
             applied_url = NULL,
             date_processed = NULL,
             scan_session_id = COALESCE(excluded.scan_session_id, art_items.scan_session_id)",
    )?;
    for art_type in art_types {
        stmt.execute(params![
            queue_id,
            art_type.as_str(),
            ReviewMode::MissingOnly.as_str(),
            session_id
        ])?;
    }
    Ok(())
}

/// Queue a batch of items and their art items in one transaction.
/// Returns the queue ids in input order.
pub fn queue_missing_batch(
    conn: &Connection,
    entries: &[NewQueueEntry],
    session_id: Option<i64>,
) -> Result<Vec<i64>, DbError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let tx = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = add_to_queue(
            &tx,
            entry.kind,
            entry.dbid,
            &entry.title,
            entry.year,
            entry.scope.as_deref(),
            session_id,
        )?;
        add_art_items(&tx, id, &entry.art_types, session_id)?;
        ids.push(id);
    }
    tx.commit()?;
    Ok(ids)
}

// ── Retrieval ───────────────────────────────────────────────────────────────

/// Next pending entries, lowest priority value first, then insertion order.
/// An empty `kinds` slice means every kind.
pub fn get_next_batch(
    conn: &Connection,
    limit: usize,
    kinds: &[MediaKind],
) -> Result<Vec<QueueEntry>, DbError> {
    let mut sql = String::from(
        "SELECT id, media_type, dbid, title, year, status, priority, scope, scan_session_id, guid, date_added, date_processed
         FROM art_queue WHERE status = 'pending'",
    );
    let mut values: Vec<Value> = Vec::new();
    push_kind_filter(&mut sql, &mut values, kinds, "media_type");
    sql.push_str(" ORDER BY priority ASC, id ASC LIMIT ?");
    values.push(Value::Integer(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), row_to_queue_entry)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().flatten().collect())
}

pub fn get_queue_entry(conn: &Connection, id: i64) -> Result<Option<QueueEntry>, DbError> {
    let result = conn.query_row(
        "SELECT id, media_type, dbid, title, year, status, priority, scope, scan_session_id, guid, date_added, date_processed
         FROM art_queue WHERE id = ?1",
        [id],
        row_to_queue_entry,
    );
    match result {
        Ok(entry) => Ok(entry),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Art items of one entry, in art-type priority order.
pub fn get_art_items(conn: &Connection, queue_id: i64) -> Result<Vec<ArtItemEntry>, DbError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, queue_id, art_type, review_mode, status, auto_applied, applied_url, scan_session_id, date_processed
         FROM art_items WHERE queue_id = ?1",
    )?;
    let mut items: Vec<ArtItemEntry> = stmt
        .query_map([queue_id], row_to_art_item)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();
    items.sort_by_key(|i| i.art_type);
    Ok(items)
}

/// Art items for several entries, keyed by queue id. Every requested id
/// is present in the result, possibly with an empty list.
pub fn get_art_items_for_queue_batch(
    conn: &Connection,
    queue_ids: &[i64],
) -> Result<HashMap<i64, Vec<ArtItemEntry>>, DbError> {
    let mut result: HashMap<i64, Vec<ArtItemEntry>> =
        queue_ids.iter().map(|id| (*id, Vec::new())).collect();
    if queue_ids.is_empty() {
        return Ok(result);
    }
    let placeholders = vec!["?"; queue_ids.len()].join(",");
    let sql = format!(
        "SELECT id, queue_id, art_type, review_mode, status, auto_applied, applied_url, scan_session_id, date_processed
         FROM art_items WHERE queue_id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(queue_ids.iter()), row_to_art_item)?;
    for row in rows {
        if let Some(item) = row? {
            result.entry(item.queue_id).or_default().push(item);
        }
    }
    for items in result.values_mut() {
        items.sort_by_key(|i| i.art_type);
    }
    Ok(result)
}

// ── Updates ─────────────────────────────────────────────────────────────────

pub fn update_queue_status(conn: &Connection, id: i64, status: QueueStatus) -> Result<(), DbError> {
    let processed = status.is_terminal().then(|| format_ts(Utc::now()));
    let changed = conn.execute(
        "UPDATE art_queue SET status = ?1, date_processed = ?2 WHERE id = ?3",
        params![status.as_str(), processed, id],
    )?;
    if changed == 0 {
        return Err(DbError::not_found("queue entry", id));
    }
    Ok(())
}

/// Record that `url` was written to the art item's slot.
pub fn update_art_item(
    conn: &Connection,
    id: i64,
    url: &str,
    auto_applied: bool,
) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE art_items
         SET applied_url = ?1, auto_applied = ?2, status = 'completed', date_processed = ?3
         WHERE id = ?4",
        params![url, auto_applied, format_ts(Utc::now()), id],
    )?;
    if changed == 0 {
        return Err(DbError::not_found("art item", id));
    }
    Ok(())
}

/// Change an art item's status without touching its applied url.
pub fn update_art_item_status(
    conn: &Connection,
    id: i64,
    status: ArtItemStatus,
) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE art_items SET status = ?1, date_processed = COALESCE(date_processed, ?2)
         WHERE id = ?3",
        params![status.as_str(), format_ts(Utc::now()), id],
    )?;
    if changed == 0 {
        return Err(DbError::not_found("art item", id));
    }
    Ok(())
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Entry counts by status, optionally limited to some kinds.
pub fn get_queue_stats(conn: &Connection, kinds: &[MediaKind]) -> Result<QueueStats, DbError> {
    let mut sql = String::from("SELECT status, COUNT(*) FROM art_queue WHERE 1=1");
    let mut values = Vec::new();
    push_kind_filter(&mut sql, &mut values, kinds, "media_type");
    sql.push_str(" GROUP BY status");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut stats = QueueStats::default();
    for row in rows {
        let (status, count) = row?;
        let count = count as u64;
        match QueueStatus::parse(&status) {
            Some(QueueStatus::Pending) => stats.pending += count,
            Some(QueueStatus::Completed) => stats.completed += count,
            Some(QueueStatus::Skipped) => stats.skipped += count,
            Some(QueueStatus::Error) => stats.error += count,
            None => log::warn!("Ignoring {count} queue entries with unknown status '{status}'"),
        }
    }
    Ok(stats)
}

/// Per-kind breakdown of [`get_queue_stats`].
pub fn get_queue_breakdown(
    conn: &Connection,
) -> Result<Vec<(MediaKind, QueueStats)>, DbError> {
    let mut out = Vec::new();
    for kind in MediaKind::all() {
        let stats = get_queue_stats(conn, &[*kind])?;
        if stats.total() > 0 {
            out.push((*kind, stats));
        }
    }
    Ok(out)
}

pub fn count_queue_items(
    conn: &Connection,
    status: Option<QueueStatus>,
    kinds: &[MediaKind],
) -> Result<u64, DbError> {
    let mut sql = String::from("SELECT COUNT(*) FROM art_queue WHERE 1=1");
    let mut values = Vec::new();
    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    push_kind_filter(&mut sql, &mut values, kinds, "media_type");
    let count: i64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
    Ok(count as u64)
}

// ── Cleanup ─────────────────────────────────────────────────────────────────

/// Delete terminal entries of the given kinds that have no pending art items.
/// Run before a rescan so the queue only holds live work.
pub fn prune_inactive_queue_items(conn: &Connection, kinds: &[MediaKind]) -> Result<usize, DbError> {
    let mut sql = String::from(
        "DELETE FROM art_queue
         WHERE status != 'pending'
           AND id NOT IN (SELECT DISTINCT queue_id FROM art_items WHERE status = 'pending')",
    );
    let mut values = Vec::new();
    push_kind_filter(&mut sql, &mut values, kinds, "media_type");
    let removed = conn.execute(&sql, params_from_iter(values))?;
    if removed > 0 {
        log::debug!("Pruned {removed} inactive queue entries");
    }
    Ok(removed)
}

/// Put non-pending entries that still own pending art items back to
/// pending. Used when resuming a session.
pub fn restore_pending_queue_items(conn: &Connection, kinds: &[MediaKind]) -> Result<usize, DbError> {
    let mut sql = String::from(
        "UPDATE art_queue SET status = 'pending', date_processed = NULL
         WHERE status != 'pending'
           AND id IN (SELECT DISTINCT queue_id FROM art_items WHERE status = 'pending')",
    );
    let mut values = Vec::new();
    push_kind_filter(&mut sql, &mut values, kinds, "media_type");
    Ok(conn.execute(&sql, params_from_iter(values))?)
}

/// Delete terminal entries processed more than `days` days ago.
pub fn cleanup_old_queue_items(conn: &Connection, days: i64) -> Result<usize, DbError> {
    let cutoff = format_ts(Utc::now() - Duration::days(days));
    let removed = conn.execute(
        "DELETE FROM art_queue
         WHERE status IN ('completed', 'skipped', 'error')
           AND date_processed IS NOT NULL
           AND date_processed < ?1",
        [cutoff],
    )?;
    if removed > 0 {
        log::info!("Cleaned up {removed} old queue entries");
    }
    Ok(removed)
}

/// Delete every entry (and, by cascade, art item) of the given kinds.
pub fn clear_queue_for_media(conn: &Connection, kinds: &[MediaKind]) -> Result<usize, DbError> {
    if kinds.is_empty() {
        return Ok(0);
    }
    let mut sql = String::from("DELETE FROM art_queue WHERE 1=1");
    let mut values = Vec::new();
    push_kind_filter(&mut sql, &mut values, kinds, "media_type");
    Ok(conn.execute(&sql, params_from_iter(values))?)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn push_kind_filter(sql: &mut String, values: &mut Vec<Value>, kinds: &[MediaKind], column: &str) {
    if kinds.is_empty() {
        return;
    }
    let placeholders = vec!["?"; kinds.len()].join(",");
    sql.push_str(&format!(" AND {column} IN ({placeholders})"));
    values.extend(kinds.iter().map(|k| Value::Text(k.short_name().to_string())));
}

/// Rows with an unknown kind or status are skipped (`Ok(None)`).
fn row_to_queue_entry(row: &Row<'_>) -> rusqlite::Result<Option<QueueEntry>> {
    let kind: String = row.get(1)?;
    let status: String = row.get(5)?;
    let (Ok(kind), Some(status)) = (kind.parse::<MediaKind>(), QueueStatus::parse(&status)) else {
        return Ok(None);
    };
    Ok(Some(QueueEntry {
        id: row.get(0)?,
        kind,
        dbid: row.get(2)?,
        title: row.get(3)?,
        year: row.get(4)?,
        status,
        priority: row.get(6)?,
        scope: row.get(7)?,
        scan_session_id: row.get(8)?,
        guid: row.get(9)?,
        date_added: row.get(10)?,
        date_processed: row.get(11)?,
    }))
}

fn row_to_art_item(row: &Row<'_>) -> rusqlite::Result<Option<ArtItemEntry>> {
    let art_type: String = row.get(2)?;
    let mode: String = row.get(3)?;
    let status: String = row.get(4)?;
    let (Ok(art_type), Some(review_mode), Some(status)) = (
        art_type.parse::<ArtType>(),
        ReviewMode::parse(&mode),
        ArtItemStatus::parse(&status),
    ) else {
        return Ok(None);
    };
    Ok(Some(ArtItemEntry {
        id: row.get(0)?,
        queue_id: row.get(1)?,
        art_type,
        review_mode,
        status,
        auto_applied: row.get(5)?,
        applied_url: row.get(6)?,
        scan_session_id: row.get(7)?,
        date_processed: row.get(8)?,
    }))
}
