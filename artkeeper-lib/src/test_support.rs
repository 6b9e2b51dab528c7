//! Fakes shared by the pipeline tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use artkeeper_core::{ArtMap, ArtType, Candidate, LibraryHost, LibraryItem, MediaKind, Provider};
use artkeeper_scraper::{ImageCatalog, MultiSourceFetcher, ScrapeError, TmdbKind};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::host::JsonLibrary;
use crate::library_cache::LibraryCache;
use crate::pipeline::Pipeline;
use crate::store::Store;

/// TMDB stand-in: every movie id except "0" gets `count` English posters
/// with descending vote counts, plus one text-free backdrop.
pub struct FakeTmdb {
    count: usize,
    calls: AtomicUsize,
    pub failing: AtomicBool,
    on_fetch: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl FakeTmdb {
    pub fn posters(count: usize) -> Self {
        Self {
            count,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            on_fetch: Mutex::new(None),
        }
    }

    /// Run `hook` inside every `title_images` call, before it answers.
    pub fn on_fetch(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_fetch.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageCatalog for FakeTmdb {
    fn title_images<'a>(
        &'a self,
        _kind: TmdbKind,
        id: &'a str,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_fetch.lock().unwrap().as_ref() {
            hook();
        }
        let failing = self.failing.load(Ordering::SeqCst);
        async move {
            if failing {
                return Err(ScrapeError::Status {
                    status: 503,
                    url: format!("https://api.test/{id}"),
                });
            }
            let mut art = ArtMap::new();
            if id == "0" {
                return Ok(art);
            }
            let posters = (0..self.count)
                .map(|n| {
                    Candidate::new(format!("https://img.test/{id}/poster{n}.jpg"), Provider::Tmdb)
                        .with_language(Some("en"))
                        .with_votes(7.0, (10 * (self.count - n)) as u32)
                        .with_size(1000, 1500)
                })
                .collect();
            art.insert(ArtType::Poster, posters);
            art.insert(
                ArtType::Fanart,
                vec![
                    Candidate::new(format!("https://img.test/{id}/backdrop.jpg"), Provider::Tmdb)
                        .with_size(1920, 1080),
                ],
            );
            Ok(art)
        }
        .boxed()
    }

    fn season_images<'a>(
        &'a self,
        _show_id: &'a str,
        _season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async { Ok(ArtMap::new()) }.boxed()
    }

    fn episode_images<'a>(
        &'a self,
        _show_id: &'a str,
        _season: u32,
        _episode: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async { Ok(ArtMap::new()) }.boxed()
    }

    fn movie_collection<'a>(
        &'a self,
        _movie_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ScrapeError>> {
        async { Ok(None) }.boxed()
    }
}

pub fn movie(dbid: i64, title: &str, tmdb: Option<&str>) -> LibraryItem {
    let mut item = LibraryItem::new(MediaKind::Movie, dbid, title);
    item.year = Some(1999);
    item.ids.tmdb = tmdb.map(str::to_string);
    item
}

/// A pipeline over an in-memory library and store, with `tmdb` as the
/// only provider.
pub fn pipeline(items: Vec<LibraryItem>, tmdb: Arc<FakeTmdb>) -> (Pipeline, Arc<JsonLibrary>) {
    let host = Arc::new(JsonLibrary::in_memory(items));
    let library = Arc::new(LibraryCache::new(host.clone()));
    let store = Store::memory().unwrap();
    let fetch_host: Arc<dyn LibraryHost> = library.clone();
    let fetcher = MultiSourceFetcher::new(fetch_host, store.cache()).with_tmdb(tmdb);
    (Pipeline::new(store, library, fetcher), host)
}

pub fn no_progress(_: crate::progress::PipelineProgress) {}
