//! Short-lived memo of library item reads.
//!
//! Fetch strategies look up parent shows and set members repeatedly; a
//! season scan would otherwise query the same show once per season. The
//! cache is an injected service: build one per run, pass it where a
//! [`LibraryHost`] is expected, and shut it down when the run ends.
//! When full, the least recently read item is evicted.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use artkeeper_core::{ArtType, HostError, LibraryHost, LibraryItem, MediaKind};
use lru::LruCache;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
pub const MAX_ENTRIES: usize = 200;

struct Entry {
    expires: Instant,
    item: Option<LibraryItem>,
}

pub struct LibraryCache {
    inner: Arc<dyn LibraryHost>,
    ttl: Duration,
    entries: Mutex<LruCache<(MediaKind, i64), Entry>>,
    active: AtomicBool,
}

impl LibraryCache {
    pub fn new(inner: Arc<dyn LibraryHost>) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: Arc<dyn LibraryHost>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(MAX_ENTRIES).unwrap_or(NonZeroUsize::MIN),
            )),
            active: AtomicBool::new(true),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<(MediaKind, i64), Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop one item so the next read goes to the host.
    pub fn invalidate(&self, kind: MediaKind, dbid: i64) {
        self.entries().pop(&(kind, dbid));
    }

    pub fn invalidate_all(&self) {
        self.entries().clear();
    }

    /// Empty the cache and pass every later read straight through.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.invalidate_all();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read straight from the host and refresh the memo.
    pub fn get_fresh(&self, kind: MediaKind, dbid: i64) -> Result<Option<LibraryItem>, HostError> {
        self.invalidate(kind, dbid);
        self.get_item(kind, dbid)
    }
}

impl LibraryHost for LibraryCache {
    fn get_item(&self, kind: MediaKind, dbid: i64) -> Result<Option<LibraryItem>, HostError> {
        if !self.active.load(Ordering::SeqCst) {
            return self.inner.get_item(kind, dbid);
        }
        let now = Instant::now();
        {
            let mut entries = self.entries();
            let cached = entries
                .get(&(kind, dbid))
                .map(|entry| (entry.expires > now).then(|| entry.item.clone()));
            match cached {
                Some(Some(item)) => return Ok(item),
                Some(None) => {
                    entries.pop(&(kind, dbid));
                }
                None => {}
            }
        }

        let item = self.inner.get_item(kind, dbid)?;
        self.entries().put(
            (kind, dbid),
            Entry {
                expires: now + self.ttl,
                item: item.clone(),
            },
        );
        Ok(item)
    }

    fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>, HostError> {
        self.inner.list_items(kind)
    }

    fn set_artwork(
        &self,
        kind: MediaKind,
        dbid: i64,
        art: &BTreeMap<ArtType, String>,
    ) -> Result<bool, HostError> {
        let result = self.inner.set_artwork(kind, dbid, art);
        self.invalidate(kind, dbid);
        result
    }

    fn set_members(&self, set_dbid: i64) -> Result<Vec<LibraryItem>, HostError> {
        self.inner.set_members(set_dbid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::host::JsonLibrary;

    struct Counting {
        lib: JsonLibrary,
        reads: AtomicUsize,
    }

    impl LibraryHost for Counting {
        fn get_item(&self, kind: MediaKind, dbid: i64) -> Result<Option<LibraryItem>, HostError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.lib.get_item(kind, dbid)
        }
        fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>, HostError> {
            self.lib.list_items(kind)
        }
        fn set_artwork(
            &self,
            kind: MediaKind,
            dbid: i64,
            art: &BTreeMap<ArtType, String>,
        ) -> Result<bool, HostError> {
            self.lib.set_artwork(kind, dbid, art)
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            lib: JsonLibrary::in_memory(vec![LibraryItem::new(MediaKind::TvShow, 7, "Dark")]),
            reads: AtomicUsize::new(0),
        })
    }

    #[test]
    fn repeated_reads_hit_memo() {
        let host = counting();
        let cache = LibraryCache::new(host.clone());
        for _ in 0..5 {
            assert!(cache.get_item(MediaKind::TvShow, 7).unwrap().is_some());
        }
        assert_eq!(host.reads.load(Ordering::SeqCst), 1);

        cache.invalidate(MediaKind::TvShow, 7);
        cache.get_item(MediaKind::TvShow, 7).unwrap();
        assert_eq!(host.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn writes_invalidate_entry() {
        let host = counting();
        let cache = LibraryCache::new(host.clone());
        let before = cache.get_item(MediaKind::TvShow, 7).unwrap().unwrap();
        assert!(!before.has_art(ArtType::Poster));

        let mut art = BTreeMap::new();
        art.insert(ArtType::Poster, "https://x/p.jpg".to_string());
        cache.set_artwork(MediaKind::TvShow, 7, &art).unwrap();

        let after = cache.get_item(MediaKind::TvShow, 7).unwrap().unwrap();
        assert!(after.has_art(ArtType::Poster));
    }

    #[test]
    fn expired_entries_are_refetched() {
        let host = counting();
        let cache = LibraryCache::with_ttl(host.clone(), Duration::ZERO);
        cache.get_item(MediaKind::TvShow, 7).unwrap();
        cache.get_item(MediaKind::TvShow, 7).unwrap();
        assert_eq!(host.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shutdown_passes_through() {
        let host = counting();
        let cache = LibraryCache::new(host.clone());
        cache.get_item(MediaKind::TvShow, 7).unwrap();
        cache.shutdown();
        assert!(cache.is_empty());
        cache.get_item(MediaKind::TvShow, 7).unwrap();
        cache.get_item(MediaKind::TvShow, 7).unwrap();
        assert_eq!(host.reads.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_items_are_memoised_too() {
        let host = counting();
        let cache = LibraryCache::new(host.clone());
        assert!(cache.get_item(MediaKind::Movie, 99).unwrap().is_none());
        assert!(cache.get_item(MediaKind::Movie, 99).unwrap().is_none());
        assert_eq!(host.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_cache_evicts_least_recently_read() {
        let host = counting();
        let cache = LibraryCache::new(host.clone());
        for dbid in 0..MAX_ENTRIES as i64 {
            cache.get_item(MediaKind::Movie, dbid).unwrap();
        }
        // Touch the oldest entry so it becomes the most recent.
        cache.get_item(MediaKind::Movie, 0).unwrap();
        cache.get_item(MediaKind::Movie, 1000).unwrap();

        assert_eq!(cache.len(), MAX_ENTRIES);
        let reads = MAX_ENTRIES + 1;
        assert_eq!(host.reads.load(Ordering::SeqCst), reads);

        cache.get_item(MediaKind::Movie, 0).unwrap();
        cache.get_item(MediaKind::Movie, 2).unwrap();
        assert_eq!(host.reads.load(Ordering::SeqCst), reads);

        cache.get_item(MediaKind::Movie, 1).unwrap();
        assert_eq!(host.reads.load(Ordering::SeqCst), reads + 1);
    }
}
