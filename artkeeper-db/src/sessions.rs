//! Scan session persistence.
//!
//! A session is the resumable envelope around one scan or review run. Its
//! media-type and art-type sets live in junction tables; its statistics are
//! a typed [`SessionStats`] stored as JSON.

use std::collections::BTreeSet;

use artkeeper_core::{ArtType, MediaKind, ScanType, SessionStats, SessionStatus};
use chrono::Utc;
use rusqlite::{Connection, Row, params};

use crate::error::DbError;
use crate::format_ts;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub id: i64,
    pub scan_type: ScanType,
    pub status: SessionStatus,
    pub stats: SessionStats,
    pub started_at: String,
    pub last_activity: String,
    pub completed_at: Option<String>,
}

const SESSION_COLUMNS: &str =
    "id, scan_type, status, stats, started_at, last_activity, completed_at";

/// Create a running session with its media-type and art-type sets.
pub fn create_scan_session(
    conn: &Connection,
    scan_type: ScanType,
    kinds: &[MediaKind],
    art_types: &[ArtType],
) -> Result<i64, DbError> {
    let now = format_ts(Utc::now());
    let stats = SessionStats::default().to_json()?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO scan_sessions (scan_type, status, stats, started_at, last_activity)
         VALUES (?1, 'running', ?2, ?3, ?3)",
        params![scan_type.as_str(), stats, now],
    )?;
    let id = tx.last_insert_rowid();
    for kind in kinds {
        tx.execute(
            "INSERT OR IGNORE INTO session_media_types (session_id, media_type) VALUES (?1, ?2)",
            params![id, kind.short_name()],
        )?;
    }
    for art_type in art_types {
        tx.execute(
            "INSERT OR IGNORE INTO session_art_types (session_id, art_type) VALUES (?1, ?2)",
            params![id, art_type.as_str()],
        )?;
    }
    tx.commit()?;
    log::debug!("Created {scan_type} session {id}");
    Ok(id)
}

pub fn get_session(conn: &Connection, id: i64) -> Result<Option<ScanSession>, DbError> {
    let result = conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM scan_sessions WHERE id = ?1"),
        [id],
        row_to_raw_session,
    );
    match result {
        Ok(raw) => raw.into_session().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist stats and bump `last_activity`.
pub fn update_session_stats(
    conn: &Connection,
    id: i64,
    stats: &SessionStats,
) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE scan_sessions SET stats = ?1, last_activity = ?2 WHERE id = ?3",
        params![stats.to_json()?, format_ts(Utc::now()), id],
    )?;
    if changed == 0 {
        return Err(DbError::not_found("scan session", id));
    }
    Ok(())
}

/// Mark a paused (or crashed) session running again.
pub fn resume_session(conn: &Connection, id: i64) -> Result<(), DbError> {
    set_status(conn, id, SessionStatus::Running, None)
}

/// Pause with the exact counters reached so far.
pub fn pause_session(conn: &Connection, id: i64, stats: &SessionStats) -> Result<(), DbError> {
    set_status(conn, id, SessionStatus::Paused, Some(stats))
}

pub fn complete_session(conn: &Connection, id: i64, stats: &SessionStats) -> Result<(), DbError> {
    set_status(conn, id, SessionStatus::Completed, Some(stats))
}

pub fn cancel_session(conn: &Connection, id: i64) -> Result<(), DbError> {
    set_status(conn, id, SessionStatus::Cancelled, None)
}

fn set_status(
    conn: &Connection,
    id: i64,
    status: SessionStatus,
    stats: Option<&SessionStats>,
) -> Result<(), DbError> {
    let current = get_session(conn, id)?.ok_or_else(|| DbError::not_found("scan session", id))?;
    if current.status.is_terminal() && current.status != status {
        return Err(DbError::invalid_state(format!(
            "session {id} is already {}",
            current.status
        )));
    }

    let now = format_ts(Utc::now());
    let completed_at = status.is_terminal().then(|| now.clone());
    let stats_json = match stats {
        Some(s) => Some(s.to_json()?),
        None => None,
    };
    conn.execute(
        "UPDATE scan_sessions
         SET status = ?1, last_activity = ?2, completed_at = ?3, stats = COALESCE(?4, stats)
         WHERE id = ?5",
        params![status.as_str(), now, completed_at, stats_json, id],
    )?;
    log::debug!("Session {id} -> {status}");
    Ok(())
}

/// Paused sessions, most recently active first.
pub fn get_paused_sessions(conn: &Connection) -> Result<Vec<ScanSession>, DbError> {
    list_sessions_where(conn, "status = 'paused'")
}

/// Every non-terminal session, most recently active first.
pub fn get_open_sessions(conn: &Connection) -> Result<Vec<ScanSession>, DbError> {
    list_sessions_where(conn, "status IN ('running', 'paused')")
}

fn list_sessions_where(conn: &Connection, filter: &str) -> Result<Vec<ScanSession>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM scan_sessions WHERE {filter}
         ORDER BY last_activity DESC, id DESC"
    ))?;
    let raws = stmt
        .query_map([], row_to_raw_session)?
        .collect::<Result<Vec<_>, _>>()?;
    let mut sessions = Vec::with_capacity(raws.len());
    for raw in raws {
        match raw.into_session() {
            Ok(s) => sessions.push(s),
            Err(e) => log::warn!("Skipping unreadable session row: {e}"),
        }
    }
    Ok(sessions)
}

pub fn get_session_media_types(conn: &Connection, id: i64) -> Result<BTreeSet<MediaKind>, DbError> {
    let mut stmt = conn.prepare_cached(
        "SELECT media_type FROM session_media_types WHERE session_id = ?1",
    )?;
    let names = stmt
        .query_map([id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().filter_map(|n| n.parse().ok()).collect())
}

pub fn get_session_art_types(conn: &Connection, id: i64) -> Result<BTreeSet<ArtType>, DbError> {
    let mut stmt = conn.prepare_cached(
        "SELECT art_type FROM session_art_types WHERE session_id = ?1",
    )?;
    let names = stmt
        .query_map([id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().filter_map(|n| n.parse().ok()).collect())
}

/// The non-terminal session of this type covering exactly `kinds`, if any.
///
/// A session left `running` by a crash counts as resumable.
pub fn find_resumable_session(
    conn: &Connection,
    scan_type: ScanType,
    kinds: &[MediaKind],
) -> Result<Option<ScanSession>, DbError> {
    let wanted: BTreeSet<MediaKind> = kinds.iter().copied().collect();
    for session in get_open_sessions(conn)? {
        if session.scan_type != scan_type {
            continue;
        }
        if get_session_media_types(conn, session.id)? == wanted {
            return Ok(Some(session));
        }
    }
    Ok(None)
}

struct RawSession {
    id: i64,
    scan_type: String,
    status: String,
    stats: String,
    started_at: String,
    last_activity: String,
    completed_at: Option<String>,
}

impl RawSession {
    fn into_session(self) -> Result<ScanSession, DbError> {
        let scan_type = ScanType::parse(&self.scan_type).ok_or_else(|| {
            DbError::invalid_state(format!("unknown scan type '{}'", self.scan_type))
        })?;
        let status = SessionStatus::parse(&self.status).ok_or_else(|| {
            DbError::invalid_state(format!("unknown session status '{}'", self.status))
        })?;
        let stats = SessionStats::from_json(&self.stats).unwrap_or_else(|e| {
            log::warn!("Session {} has unreadable stats, starting fresh: {e}", self.id);
            SessionStats::default()
        });
        Ok(ScanSession {
            id: self.id,
            scan_type,
            status,
            stats,
            started_at: self.started_at,
            last_activity: self.last_activity,
            completed_at: self.completed_at,
        })
    }
}

fn row_to_raw_session(row: &Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        scan_type: row.get(1)?,
        status: row.get(2)?,
        stats: row.get(3)?,
        started_at: row.get(4)?,
        last_activity: row.get(5)?,
        completed_at: row.get(6)?,
    })
}
