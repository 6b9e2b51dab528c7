//! Provider seams.
//!
//! The fetcher only talks to these traits, so tests can substitute fakes
//! and missing API keys simply leave a provider out.

use std::collections::HashMap;

use artkeeper_core::ArtMap;
use futures::future::BoxFuture;

use crate::error::ScrapeError;

/// Which TMDB image collection to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmdbKind {
    Movie,
    Tv,
    Collection,
}

impl TmdbKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
            Self::Collection => "collection",
        }
    }
}

/// Rich image catalogue keyed by numeric ids (TMDB).
pub trait ImageCatalog: Send + Sync {
    fn title_images<'a>(
        &'a self,
        kind: TmdbKind,
        id: &'a str,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    fn season_images<'a>(
        &'a self,
        show_id: &'a str,
        season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    fn episode_images<'a>(
        &'a self,
        show_id: &'a str,
        season: u32,
        episode: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    /// Collection id a movie belongs to, if any.
    fn movie_collection<'a>(
        &'a self,
        movie_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ScrapeError>>;
}

/// Artist-level art plus album art keyed by release-group id.
#[derive(Debug, Clone, Default)]
pub struct MusicArt {
    pub artist: ArtMap,
    pub albums: HashMap<String, ArtMap>,
}

/// Community-curated artwork (fanart.tv).
pub trait CommunityArt: Send + Sync {
    fn movie_art<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    fn tv_art<'a>(&'a self, tvdb_id: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    fn season_art<'a>(
        &'a self,
        tvdb_id: &'a str,
        season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    fn music_art<'a>(&'a self, artist_mbid: &'a str)
    -> BoxFuture<'a, Result<MusicArt, ScrapeError>>;
}

/// An album as the music catalogue knows it.
#[derive(Debug, Clone, Default)]
pub struct AlbumRecord {
    /// Release-group id the catalogue files this album under.
    pub musicbrainz_id: Option<String>,
    pub art: ArtMap,
}

/// Music metadata catalogue with name search (TheAudioDB).
pub trait MusicCatalog: Send + Sync {
    fn artist_art<'a>(&'a self, mbid: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>>;

    fn album<'a>(
        &'a self,
        release_group: &'a str,
    ) -> BoxFuture<'a, Result<Option<AlbumRecord>, ScrapeError>>;

    fn search_album<'a>(
        &'a self,
        artist: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, Result<Option<AlbumRecord>, ScrapeError>>;
}
