//! SQLite schema creation and versioning.

use rusqlite::Connection;

use crate::error::DbError;

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Create all tables and indexes if they don't exist.
///
/// This is idempotent: safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA_SQL)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create the artwork database at the given path.
pub fn open_database(path: &std::path::Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::InvalidState(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;

    let version = get_schema_version(&conn)?;
    if version > CURRENT_VERSION {
        return Err(DbError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }
    if version < CURRENT_VERSION {
        log::debug!(
            "Initialising schema at {} (found version {version})",
            path.display()
        );
        create_schema(&conn)?;
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, DbError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO schema_version (version)
         SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM schema_version WHERE version = ?1)",
        [version],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Provider artwork cache: one row per (item, provider, art type)
CREATE TABLE IF NOT EXISTS artwork_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_type TEXT NOT NULL,
    media_id TEXT NOT NULL,
    source TEXT NOT NULL,
    art_type TEXT NOT NULL,
    data TEXT NOT NULL,
    release_date TEXT,
    cached_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    UNIQUE(media_type, media_id, source, art_type)
);
CREATE INDEX IF NOT EXISTS idx_artwork_cache_expires ON artwork_cache(expires_at);

-- Discovered provider id aliases (old id -> canonical id)
CREATE TABLE IF NOT EXISTS id_mappings (
    namespace TEXT NOT NULL,
    old_id TEXT NOT NULL,
    canonical_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY(namespace, old_id)
);
CREATE INDEX IF NOT EXISTS idx_id_mappings_canonical ON id_mappings(namespace, canonical_id);

-- Resumable scan / review sessions
CREATE TABLE IF NOT EXISTS scan_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'running',
    stats TEXT NOT NULL DEFAULT '{}',
    started_at TEXT NOT NULL,
    last_activity TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_scan_sessions_status ON scan_sessions(status);

CREATE TABLE IF NOT EXISTS session_media_types (
    session_id INTEGER NOT NULL REFERENCES scan_sessions(id) ON DELETE CASCADE,
    media_type TEXT NOT NULL,
    PRIMARY KEY(session_id, media_type)
);

CREATE TABLE IF NOT EXISTS session_art_types (
    session_id INTEGER NOT NULL REFERENCES scan_sessions(id) ON DELETE CASCADE,
    art_type TEXT NOT NULL,
    PRIMARY KEY(session_id, art_type)
);

-- Library items awaiting artwork
CREATE TABLE IF NOT EXISTS art_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_type TEXT NOT NULL,
    dbid INTEGER NOT NULL,
    title TEXT NOT NULL,
    year INTEGER,
    status TEXT NOT NULL DEFAULT 'pending',
    priority INTEGER NOT NULL DEFAULT 5,
    scope TEXT,
    scan_session_id INTEGER REFERENCES scan_sessions(id) ON DELETE SET NULL,
    guid TEXT NOT NULL,
    date_added TEXT NOT NULL,
    date_processed TEXT,
    UNIQUE(media_type, dbid)
);
CREATE INDEX IF NOT EXISTS idx_art_queue_status ON art_queue(status, priority, id);
CREATE INDEX IF NOT EXISTS idx_art_queue_session ON art_queue(scan_session_id);

-- One row per requested art type of a queue entry
CREATE TABLE IF NOT EXISTS art_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    queue_id INTEGER NOT NULL REFERENCES art_queue(id) ON DELETE CASCADE,
    art_type TEXT NOT NULL,
    review_mode TEXT NOT NULL DEFAULT 'missing_only',
    status TEXT NOT NULL DEFAULT 'pending',
    auto_applied BOOLEAN NOT NULL DEFAULT 0,
    applied_url TEXT,
    scan_session_id INTEGER REFERENCES scan_sessions(id) ON DELETE SET NULL,
    date_processed TEXT,
    UNIQUE(queue_id, art_type)
);
CREATE INDEX IF NOT EXISTS idx_art_items_queue ON art_items(queue_id);
"#;
