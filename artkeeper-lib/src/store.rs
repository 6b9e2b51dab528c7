//! Shared handle to the artwork database.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use artkeeper_db::{self as db, DbError};
use artkeeper_scraper::ArtworkCache;
use rusqlite::Connection;

/// One SQLite connection shared by the queue/session drivers and the
/// artwork cache.
///
/// Each call holds the lock for the duration of the closure only. Never
/// await while inside [`Store::with`].
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn memory() -> Result<Self, DbError> {
        Ok(Self::from_connection(db::open_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Artwork cache facade over the same connection.
    pub fn cache(&self) -> ArtworkCache {
        ArtworkCache::shared(Arc::clone(&self.conn))
    }

    pub fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T, DbError>) -> Result<T, DbError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }
}
