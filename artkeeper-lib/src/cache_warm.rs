//! Populate the artwork cache ahead of a review run.

use std::sync::Arc;

use artkeeper_core::{LibraryItem, MediaKind};
use artkeeper_scraper::{FetchOptions, MultiSourceFetcher};

use crate::error::QueueError;
use crate::worker_queue::{WorkStats, WorkerQueue};

/// Totals for one warm run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmSummary {
    pub submitted: u64,
    pub duplicates: u64,
    pub warmed: u64,
    /// Items that resolved but produced no candidates.
    pub empty: u64,
    pub failed: u64,
    pub queue: WorkStats,
}

pub fn warm_key(kind: MediaKind, dbid: i64) -> String {
    format!("{}:{dbid}", kind.short_name())
}

/// Fetch every item's artwork through the worker queue.
///
/// Items are deduplicated by `kind:dbid`. `on_result` sees each finished
/// item's key and whether it succeeded, for progress display.
pub async fn warm_cache(
    fetcher: &MultiSourceFetcher,
    items: &[LibraryItem],
    workers: usize,
    opts: FetchOptions,
    mut on_result: impl FnMut(&str, bool),
) -> Result<WarmSummary, QueueError> {
    let shared = Arc::new(fetcher.clone());
    let mut queue = WorkerQueue::new(workers, move |item: LibraryItem, _cancel| {
        let fetcher = Arc::clone(&shared);
        async move { fetcher.fetch_for_item(&item, opts).await.map(|art| art.len()) }
    });

    let mut summary = WarmSummary::default();
    for item in items {
        if queue.submit(warm_key(item.kind, item.dbid), item.clone()) {
            summary.submitted += 1;
        } else {
            summary.duplicates += 1;
        }
    }
    log::info!(
        "Warming cache for {} items with {} workers",
        summary.submitted,
        queue.worker_count()
    );

    queue.start()?;
    queue.stop(true);
    while let Some(result) = queue.recv().await {
        match &result.outcome {
            Ok(0) => summary.empty += 1,
            Ok(_) => summary.warmed += 1,
            Err(e) => {
                log::warn!("Cache warm failed for {}: {e}", result.key);
                summary.failed += 1;
            }
        }
        on_result(&result.key, result.succeeded());
    }
    queue.join().await?;
    summary.queue = queue.stats();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use artkeeper_scraper::ArtworkCache;

    use crate::host::JsonLibrary;
    use crate::test_support::FakeTmdb;

    fn movie(dbid: i64, tmdb: &str) -> LibraryItem {
        let mut item = LibraryItem::new(MediaKind::Movie, dbid, format!("Movie {dbid}"));
        item.ids.tmdb = Some(tmdb.to_string());
        item
    }

    #[tokio::test]
    async fn warms_each_item_once() {
        let items = vec![movie(1, "11"), movie(2, "22"), movie(1, "11"), movie(3, "0")];
        let host = Arc::new(JsonLibrary::in_memory(items.clone()));
        let tmdb = Arc::new(FakeTmdb::posters(1));
        let cache = ArtworkCache::new(artkeeper_db::open_memory().unwrap());
        let fetcher = MultiSourceFetcher::new(host, cache.clone()).with_tmdb(tmdb.clone());

        let mut seen: HashMap<String, bool> = HashMap::new();
        let summary = warm_cache(&fetcher, &items, 2, FetchOptions::default(), |k, ok| {
            seen.insert(k.to_string(), ok);
        })
        .await
        .unwrap();

        assert_eq!(summary.submitted, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.warmed, 2);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(seen.len(), 3);
        assert!(cache.is_complete(MediaKind::Movie, "22").unwrap());

        // A second pass is served from the cache.
        let before = tmdb.calls();
        warm_cache(&fetcher, &items[..1], 1, FetchOptions::default(), |_, _| {})
            .await
            .unwrap();
        assert_eq!(tmdb.calls(), before);
    }
}
