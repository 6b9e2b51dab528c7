//! Provider artwork acquisition.
//!
//! HTTP clients for TMDB, fanart.tv and TheAudioDB, the cache TTL policy,
//! per-kind fetch strategies and the [`MultiSourceFetcher`] that ties them
//! to the artwork cache.

pub mod audiodb;
pub mod cache;
pub mod credentials;
pub mod error;
pub mod fanart;
pub mod fetch;
pub mod http;
pub mod provider;
pub mod strategy;
pub mod tmdb;
pub mod ttl;
pub mod types;

pub use audiodb::AudioDbClient;
pub use cache::ArtworkCache;
pub use credentials::{ApiKeys, KeySource, KeySources, config_path, key_sources, save_keys};
pub use error::ScrapeError;
pub use fanart::FanartClient;
pub use fetch::{FetchOptions, MultiSourceFetcher};
pub use provider::{AlbumRecord, CommunityArt, ImageCatalog, MusicArt, MusicCatalog, TmdbKind};
pub use strategy::{FetchContext, KindStrategy, ProviderResult, ResolvedIds, strategy_for};
pub use tmdb::TmdbClient;
pub use ttl::{cache_ttl, get_cache_ttl};
