//! Shared handle over the artwork cache tables.

use std::sync::{Arc, Mutex, PoisonError};

use artkeeper_core::{ArtMap, ArtType, Candidate, MediaKind, Provider};
use artkeeper_db as db;
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::error::ScrapeError;

/// Cloneable handle to the store connection used for caching.
///
/// Every call takes the lock for one statement (or one short batch) and
/// releases it before returning, so the handle can be shared by async
/// workers as long as nothing holds it across an await.
#[derive(Clone)]
pub struct ArtworkCache {
    conn: Arc<Mutex<Connection>>,
}

impl ArtworkCache {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn shared(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// The underlying connection, for callers that also drive the queue tables.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, db::DbError>,
    ) -> Result<T, ScrapeError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&conn)?)
    }

    pub fn get(
        &self,
        kind: MediaKind,
        media_id: &str,
        source: Provider,
        art_type: ArtType,
    ) -> Result<Option<Vec<Candidate>>, ScrapeError> {
        self.with_conn(|c| db::get_cached_artwork(c, kind, media_id, source, art_type))
    }

    /// Write every non-empty list of one provider's results.
    pub fn put(
        &self,
        kind: MediaKind,
        media_id: &str,
        source: Provider,
        art: &ArtMap,
        release_date: Option<NaiveDate>,
        ttl: Duration,
    ) -> Result<(), ScrapeError> {
        self.with_conn(|c| {
            for (art_type, candidates) in art {
                if candidates.is_empty() {
                    continue;
                }
                db::cache_artwork(
                    c,
                    kind,
                    media_id,
                    source,
                    *art_type,
                    candidates,
                    release_date,
                    ttl,
                )?;
            }
            Ok(())
        })
    }

    pub fn is_complete(&self, kind: MediaKind, key: &str) -> Result<bool, ScrapeError> {
        self.with_conn(|c| db::has_full_fetch_marker(c, kind, key))
    }

    /// Complete and fetched from at least every provider in `providers`.
    pub fn covers(
        &self,
        kind: MediaKind,
        key: &str,
        providers: &[Provider],
    ) -> Result<bool, ScrapeError> {
        let recorded = self.with_conn(|c| db::full_fetch_providers(c, kind, key))?;
        Ok(recorded.is_some_and(|seen| providers.iter().all(|p| seen.contains(p))))
    }

    pub fn mark_complete(
        &self,
        kind: MediaKind,
        key: &str,
        providers: &[Provider],
        release_date: Option<NaiveDate>,
        ttl: Duration,
    ) -> Result<(), ScrapeError> {
        self.with_conn(|c| db::mark_full_fetch(c, kind, key, providers, release_date, ttl))
    }

    pub fn load_batch(
        &self,
        kind: MediaKind,
        sources: &[(Provider, String)],
        art_types: &[ArtType],
    ) -> Result<ArtMap, ScrapeError> {
        let borrowed: Vec<(Provider, &str)> =
            sources.iter().map(|(p, id)| (*p, id.as_str())).collect();
        self.with_conn(|c| db::get_cached_artwork_batch(c, kind, &borrowed, art_types))
    }

    pub fn clear_item(&self, kind: MediaKind, media_ids: &[&str]) -> Result<usize, ScrapeError> {
        self.with_conn(|c| db::clear_cache_for_item(c, kind, media_ids))
    }

    pub fn old_ids(&self, namespace: &str, canonical: &str) -> Result<Vec<String>, ScrapeError> {
        self.with_conn(|c| db::old_ids_for_canonical(c, namespace, canonical))
    }

    pub fn canonical(&self, namespace: &str, old_id: &str) -> Result<Option<String>, ScrapeError> {
        self.with_conn(|c| db::canonical_for_old(c, namespace, old_id))
    }

    pub fn save_mapping(
        &self,
        namespace: &str,
        old_id: &str,
        canonical: &str,
    ) -> Result<(), ScrapeError> {
        self.with_conn(|c| db::save_id_mapping(c, namespace, old_id, canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_skips_empty_lists() {
        let cache = ArtworkCache::new(db::open_memory().unwrap());
        let mut art = ArtMap::new();
        art.insert(ArtType::Poster, vec![Candidate::new("https://x/p.jpg", Provider::Tmdb)]);
        art.insert(ArtType::Banner, Vec::new());
        cache
            .put(MediaKind::Movie, "603", Provider::Tmdb, &art, None, Duration::hours(1))
            .unwrap();

        assert!(cache
            .get(MediaKind::Movie, "603", Provider::Tmdb, ArtType::Poster)
            .unwrap()
            .is_some());
        assert!(cache
            .get(MediaKind::Movie, "603", Provider::Tmdb, ArtType::Banner)
            .unwrap()
            .is_none());
        assert!(!cache.is_complete(MediaKind::Movie, "603").unwrap());
    }
}
