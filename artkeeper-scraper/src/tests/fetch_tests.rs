use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

use artkeeper_core::{ArtType, Candidate, HostError, Provider};
use chrono::Duration;
use futures::FutureExt;
use futures::future::BoxFuture;

use super::*;
use crate::provider::{AlbumRecord, MusicArt, TmdbKind};

// ── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeHost {
    items: Mutex<Vec<LibraryItem>>,
}

impl FakeHost {
    fn with(items: Vec<LibraryItem>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
        })
    }
}

impl LibraryHost for FakeHost {
    fn get_item(&self, kind: MediaKind, dbid: i64) -> Result<Option<LibraryItem>, HostError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.kind == kind && i.dbid == dbid)
            .cloned())
    }

    fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>, HostError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.kind == kind)
            .cloned()
            .collect())
    }

    fn set_artwork(
        &self,
        _kind: MediaKind,
        _dbid: i64,
        _art: &BTreeMap<ArtType, String>,
    ) -> Result<bool, HostError> {
        Ok(true)
    }
}

fn posters(provider: Provider, prefix: &str, n: usize) -> ArtMap {
    let list = (0..n)
        .map(|i| Candidate::new(format!("https://img/{prefix}{i}.jpg"), provider))
        .collect();
    ArtMap::from([(ArtType::Poster, list)])
}

#[derive(Default)]
struct FakeTmdb {
    images: HashMap<String, ArtMap>,
    collections: HashMap<String, String>,
    calls: AtomicUsize,
    collection_calls: AtomicUsize,
}

impl ImageCatalog for FakeTmdb {
    fn title_images<'a>(
        &'a self,
        kind: TmdbKind,
        id: &'a str,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}/{id}", kind.path_segment());
        async move { Ok(self.images.get(&key).cloned().unwrap_or_default()) }.boxed()
    }

    fn season_images<'a>(
        &'a self,
        show_id: &'a str,
        season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = format!("tv/{show_id}/s{season}");
        async move { Ok(self.images.get(&key).cloned().unwrap_or_default()) }.boxed()
    }

    fn episode_images<'a>(
        &'a self,
        _show_id: &'a str,
        _season: u32,
        _episode: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(ArtMap::new()) }.boxed()
    }

    fn movie_collection<'a>(
        &'a self,
        movie_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ScrapeError>> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(self.collections.get(movie_id).cloned()) }.boxed()
    }
}

#[derive(Default)]
struct FakeFanart {
    movies: HashMap<String, ArtMap>,
    music: HashMap<String, MusicArt>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeFanart {
    fn answer(&self, map: &HashMap<String, ArtMap>, id: &str) -> Result<ArtMap, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ScrapeError::Status {
                status: 503,
                url: "https://webservice.fanart.tv/v3".into(),
            });
        }
        Ok(map.get(id).cloned().unwrap_or_default())
    }
}

impl CommunityArt for FakeFanart {
    fn movie_art<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        let result = self.answer(&self.movies, id);
        async move { result }.boxed()
    }

    fn tv_art<'a>(&'a self, tvdb_id: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        let result = self.answer(&self.movies, tvdb_id);
        async move { result }.boxed()
    }

    fn season_art<'a>(
        &'a self,
        _tvdb_id: &'a str,
        _season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async { Ok(ArtMap::new()) }.boxed()
    }

    fn music_art<'a>(
        &'a self,
        artist_mbid: &'a str,
    ) -> BoxFuture<'a, Result<MusicArt, ScrapeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let music = self.music.get(artist_mbid).cloned().unwrap_or_default();
        async move { Ok(music) }.boxed()
    }
}

#[derive(Default)]
struct FakeMusic {
    searches: HashMap<(String, String), AlbumRecord>,
    search_calls: AtomicUsize,
}

impl MusicCatalog for FakeMusic {
    fn artist_art<'a>(&'a self, _mbid: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async { Ok(ArtMap::new()) }.boxed()
    }

    fn album<'a>(
        &'a self,
        _release_group: &'a str,
    ) -> BoxFuture<'a, Result<Option<AlbumRecord>, ScrapeError>> {
        async { Ok(None) }.boxed()
    }

    fn search_album<'a>(
        &'a self,
        artist: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, Result<Option<AlbumRecord>, ScrapeError>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let found = self
            .searches
            .get(&(artist.to_string(), title.to_string()))
            .cloned();
        async move { Ok(found) }.boxed()
    }
}

fn memory_cache() -> ArtworkCache {
    ArtworkCache::new(artkeeper_db::open_memory().unwrap())
}

fn movie(dbid: i64, title: &str, tmdb: Option<&str>) -> LibraryItem {
    let mut item = LibraryItem::new(MediaKind::Movie, dbid, title);
    item.ids.tmdb = tmdb.map(str::to_string);
    item
}

const FRESH: FetchOptions = FetchOptions { bypass_cache: false };
const BYPASS: FetchOptions = FetchOptions { bypass_cache: true };

// ── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_item_without_ids_is_empty_and_item_with_ids_fetches() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603")), movie(2, "B", None)]);
    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([("movie/603".to_string(), posters(Provider::Tmdb, "p", 3))]),
        ..FakeTmdb::default()
    });
    let fetcher = MultiSourceFetcher::new(host, memory_cache()).with_tmdb(tmdb.clone());

    let a = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a[&ArtType::Poster].len(), 3);

    let b = fetcher.fetch_all(MediaKind::Movie, 2, FRESH).await.unwrap();
    assert!(b.is_empty());

    let gone = fetcher.fetch_all(MediaKind::Movie, 99, FRESH).await.unwrap();
    assert!(gone.is_empty());
    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603"))]);
    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([("movie/603".to_string(), posters(Provider::Tmdb, "t", 2))]),
        ..FakeTmdb::default()
    });
    let fanart = Arc::new(FakeFanart {
        movies: HashMap::from([("603".to_string(), posters(Provider::FanartTv, "f", 1))]),
        ..FakeFanart::default()
    });
    let fetcher = MultiSourceFetcher::new(host, memory_cache())
        .with_tmdb(tmdb.clone())
        .with_fanart(fanart.clone());

    let first = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    let second = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second[&ArtType::Poster].len(), 3);
    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fanart.calls.load(Ordering::SeqCst), 1);

    fetcher.fetch_all(MediaKind::Movie, 1, BYPASS).await.unwrap();
    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rows_without_marker_force_refetch() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603"))]);
    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([("movie/603".to_string(), posters(Provider::Tmdb, "t", 2))]),
        ..FakeTmdb::default()
    });
    let cache = memory_cache();
    // A crash after one provider's rows were written but before the marker.
    cache
        .put(
            MediaKind::Movie,
            "603",
            Provider::Tmdb,
            &posters(Provider::Tmdb, "stale", 1),
            None,
            Duration::hours(24),
        )
        .unwrap();

    let fetcher = MultiSourceFetcher::new(host, cache.clone()).with_tmdb(tmdb.clone());
    let art = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();

    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 1);
    assert!(art[&ArtType::Poster].iter().all(|c| !c.url.contains("stale")));
    assert!(cache.is_complete(MediaKind::Movie, "603").unwrap());
}

#[tokio::test]
async fn test_provider_failure_leaves_item_incomplete() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603"))]);
    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([("movie/603".to_string(), posters(Provider::Tmdb, "t", 1))]),
        ..FakeTmdb::default()
    });
    let fanart = Arc::new(FakeFanart::default());
    fanart.failing.store(true, Ordering::SeqCst);
    let cache = memory_cache();
    let fetcher = MultiSourceFetcher::new(host, cache.clone())
        .with_tmdb(tmdb.clone())
        .with_fanart(fanart.clone());

    let err = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Status { status: 503, .. }));
    assert!(!cache.is_complete(MediaKind::Movie, "603").unwrap());

    fanart.failing.store(false, Ordering::SeqCst);
    let art = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    assert_eq!(art[&ArtType::Poster].len(), 1);
    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 2);
    assert!(cache.is_complete(MediaKind::Movie, "603").unwrap());
}

#[tokio::test]
async fn test_album_stale_release_group_is_reconciled() {
    let mut album = LibraryItem::new(MediaKind::Album, 5, "Second Record");
    album.artist = Some("Band".into());
    album.ids.musicbrainz_artist = Some("artist-1".into());
    album.ids.musicbrainz_release_group = Some("rg-new".into());
    let host = FakeHost::with(vec![album]);

    let cover = ArtMap::from([(
        ArtType::Thumb,
        vec![Candidate::new("https://img/cover.jpg", Provider::FanartTv)],
    )]);
    let fanart = Arc::new(FakeFanart {
        music: HashMap::from([(
            "artist-1".to_string(),
            MusicArt {
                artist: ArtMap::new(),
                albums: HashMap::from([("rg-old".to_string(), cover)]),
            },
        )]),
        ..FakeFanart::default()
    });
    let music = Arc::new(FakeMusic {
        searches: HashMap::from([(
            ("Band".to_string(), "Second Record".to_string()),
            AlbumRecord {
                musicbrainz_id: Some("rg-old".into()),
                art: ArtMap::new(),
            },
        )]),
        ..FakeMusic::default()
    });
    let cache = memory_cache();
    let fetcher = MultiSourceFetcher::new(host, cache.clone())
        .with_fanart(fanart)
        .with_audiodb(music.clone());

    let art = fetcher.fetch_all(MediaKind::Album, 5, FRESH).await.unwrap();
    assert_eq!(art[&ArtType::Thumb][0].url, "https://img/cover.jpg");
    assert_eq!(
        cache.old_ids(artkeeper_db::MB_RELEASE_GROUP, "rg-new").unwrap(),
        vec!["rg-old".to_string()]
    );
    // Rows are cached under the library's id.
    assert!(cache
        .get(MediaKind::Album, "rg-new", Provider::FanartTv, ArtType::Thumb)
        .unwrap()
        .is_some());

    let searches_after_first = music.search_calls.load(Ordering::SeqCst);
    let again = fetcher.fetch_all(MediaKind::Album, 5, BYPASS).await.unwrap();
    assert_eq!(again[&ArtType::Thumb].len(), 1);
    assert_eq!(
        music.search_calls.load(Ordering::SeqCst),
        searches_after_first + 1,
        "only the audiodb fallback searches; the alias comes from the mapping"
    );
}

#[tokio::test]
async fn test_set_resolves_through_member_collection() {
    let mut set = LibraryItem::new(MediaKind::Set, 10, "Trilogy");
    set.ids = Default::default();
    let mut member = movie(1, "Part One", Some("603"));
    member.set_id = Some(10);
    let host = FakeHost::with(vec![set, member]);

    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([(
            "collection/2344".to_string(),
            posters(Provider::Tmdb, "c", 2),
        )]),
        collections: HashMap::from([("603".to_string(), "2344".to_string())]),
        ..FakeTmdb::default()
    });
    let cache = memory_cache();
    let fetcher = MultiSourceFetcher::new(host, cache.clone()).with_tmdb(tmdb.clone());

    let art = fetcher.fetch_all(MediaKind::Set, 10, FRESH).await.unwrap();
    assert_eq!(art[&ArtType::Poster].len(), 2);
    assert!(cache.is_complete(MediaKind::Set, "2344").unwrap());

    fetcher.fetch_all(MediaKind::Set, 10, BYPASS).await.unwrap();
    assert_eq!(tmdb.collection_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_season_uses_parent_show_ids() {
    let mut show = LibraryItem::new(MediaKind::TvShow, 3, "Show");
    show.ids.tmdb = Some("1399".into());
    let mut season = LibraryItem::new(MediaKind::Season, 30, "Season 2");
    season.parent_id = Some(3);
    season.season = Some(2);
    let host = FakeHost::with(vec![show, season]);

    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([("tv/1399/s2".to_string(), posters(Provider::Tmdb, "s", 1))]),
        ..FakeTmdb::default()
    });
    let cache = memory_cache();
    let fetcher = MultiSourceFetcher::new(host, cache.clone()).with_tmdb(tmdb);

    let art = fetcher.fetch_all(MediaKind::Season, 30, FRESH).await.unwrap();
    assert_eq!(art[&ArtType::Poster].len(), 1);
    assert!(cache.is_complete(MediaKind::Season, "1399/s2").unwrap());
}

#[tokio::test]
async fn test_cancelled_fetch_errors() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603"))]);
    let flag = Arc::new(AtomicBool::new(true));
    let fetcher = MultiSourceFetcher::new(host, memory_cache())
        .with_tmdb(Arc::new(FakeTmdb::default()))
        .with_cancel(flag);
    let err = fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Cancelled));
}

#[tokio::test]
async fn test_unconfigured_providers_yield_nothing() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603"))]);
    let cache = memory_cache();
    let fetcher = MultiSourceFetcher::new(host, cache.clone());
    assert!(fetcher.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap().is_empty());
    assert!(!cache.is_complete(MediaKind::Movie, "603").unwrap());
}

#[tokio::test]
async fn test_newly_configured_provider_bypasses_complete_marker() {
    let host = FakeHost::with(vec![movie(1, "A", Some("603"))]);
    let tmdb = Arc::new(FakeTmdb {
        images: HashMap::from([("movie/603".to_string(), posters(Provider::Tmdb, "t", 1))]),
        ..FakeTmdb::default()
    });
    let fanart = Arc::new(FakeFanart {
        movies: HashMap::from([("603".to_string(), posters(Provider::FanartTv, "f", 1))]),
        ..FakeFanart::default()
    });
    let cache = memory_cache();

    let tmdb_only = MultiSourceFetcher::new(host.clone(), cache.clone()).with_tmdb(tmdb.clone());
    let first = tmdb_only.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    assert_eq!(first[&ArtType::Poster].len(), 1);
    assert!(cache.covers(MediaKind::Movie, "603", &[Provider::Tmdb]).unwrap());
    assert!(!cache.covers(MediaKind::Movie, "603", &[Provider::Tmdb, Provider::FanartTv]).unwrap());

    let both = MultiSourceFetcher::new(host, cache.clone())
        .with_tmdb(tmdb.clone())
        .with_fanart(fanart.clone());
    let second = both.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    assert_eq!(second[&ArtType::Poster].len(), 2);
    assert_eq!(fanart.calls.load(Ordering::SeqCst), 1);
    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 2);

    // Dropping a provider again still trusts the wider marker.
    tmdb_only.fetch_all(MediaKind::Movie, 1, FRESH).await.unwrap();
    assert_eq!(tmdb.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_show_without_tmdb_id_is_keyed_by_tvdb() {
    let mut show = LibraryItem::new(MediaKind::TvShow, 4, "Only TVDB");
    show.ids.tvdb = Some("1399".into());
    let host = FakeHost::with(vec![show]);
    let fanart = Arc::new(FakeFanart {
        movies: HashMap::from([("1399".to_string(), posters(Provider::FanartTv, "f", 1))]),
        ..FakeFanart::default()
    });
    let cache = memory_cache();
    let fetcher = MultiSourceFetcher::new(host, cache.clone()).with_fanart(fanart);

    let art = fetcher.fetch_all(MediaKind::TvShow, 4, FRESH).await.unwrap();
    assert_eq!(art[&ArtType::Poster].len(), 1);
    assert!(cache.is_complete(MediaKind::TvShow, "tvdb1399").unwrap());
    assert!(!cache.is_complete(MediaKind::TvShow, "1399").unwrap());
}
