//! TMDB image client.

use artkeeper_core::{ArtMap, ArtType, Candidate, Provider, normalize_language_tag};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::Duration;

use crate::error::ScrapeError;
use crate::http::ApiClient;
use crate::provider::{ImageCatalog, TmdbKind};
use crate::types::{TmdbImage, TmdbImages, TmdbMovieDetails};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

pub struct TmdbClient {
    api: ApiClient,
    api_key: String,
    language: Option<String>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, language: Option<&str>) -> Result<Self, ScrapeError> {
        Ok(Self {
            api: ApiClient::new("TMDB", 35, Duration::from_secs(1))?,
            api_key: api_key.into(),
            language: normalize_language_tag(language),
        })
    }

    pub fn with_cancel(mut self, flag: std::sync::Arc<std::sync::atomic::AtomicBool>) -> Self {
        self.api = self.api.with_cancel(flag);
        self
    }

    async fn images(&self, path: &str) -> Result<Option<TmdbImages>, ScrapeError> {
        self.api
            .get_json(
                &format!("{BASE_URL}{path}"),
                &[("api_key", self.api_key.as_str())],
                &[],
            )
            .await
    }
}

impl ImageCatalog for TmdbClient {
    fn title_images<'a>(
        &'a self,
        kind: TmdbKind,
        id: &'a str,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            let path = format!("/{}/{id}/images", kind.path_segment());
            Ok(self
                .images(&path)
                .await?
                .map(|imgs| transform_images(&imgs, self.language.as_deref()))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn season_images<'a>(
        &'a self,
        show_id: &'a str,
        season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            let path = format!("/tv/{show_id}/season/{season}/images");
            Ok(self
                .images(&path)
                .await?
                .map(|imgs| transform_images(&imgs, self.language.as_deref()))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn episode_images<'a>(
        &'a self,
        show_id: &'a str,
        season: u32,
        episode: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            let path = format!("/tv/{show_id}/season/{season}/episode/{episode}/images");
            Ok(self
                .images(&path)
                .await?
                .map(|imgs| transform_stills(&imgs))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn movie_collection<'a>(
        &'a self,
        movie_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ScrapeError>> {
        async move {
            let details: Option<TmdbMovieDetails> = self
                .api
                .get_json(
                    &format!("{BASE_URL}/movie/{movie_id}"),
                    &[("api_key", self.api_key.as_str())],
                    &[],
                )
                .await?;
            Ok(details
                .and_then(|d| d.belongs_to_collection)
                .map(|c| c.id.to_string()))
        }
        .boxed()
    }
}

/// Convert one image entry; `.svg` and path-less entries are dropped.
fn candidate(image: &TmdbImage, preview_size: &str) -> Option<Candidate> {
    let path = image.file_path.as_deref()?;
    if path.is_empty() || path.to_ascii_lowercase().ends_with(".svg") {
        return None;
    }
    let mut c = Candidate::new(format!("{IMAGE_BASE}/original{path}"), Provider::Tmdb)
        .with_size(image.width, image.height)
        .with_language(image.iso_639_1.as_deref())
        .with_votes(image.vote_average, image.vote_count);
    c.preview_url = Some(format!("{IMAGE_BASE}/{preview_size}{path}"));
    Some(c)
}

/// Order for the landscape bucket: preferred language, then English, then
/// text-free, then everything else.
fn backdrop_rank(language: Option<&str>, preferred: Option<&str>) -> u8 {
    match language {
        Some(l) if Some(l) == preferred => 0,
        Some("en") if preferred != Some("en") => 1,
        None => 2,
        Some(_) => 3,
    }
}

/// Map a TMDB images body to art types.
///
/// Posters feed `poster` (and, when text-free, `keyart`); logos feed
/// `clearlogo`. Backdrops feed `landscape` sorted by language preference,
/// and only text-free backdrops feed `fanart`.
pub fn transform_images(images: &TmdbImages, preferred: Option<&str>) -> ArtMap {
    let mut art = ArtMap::new();

    let logos: Vec<Candidate> = images.logos.iter().filter_map(|i| candidate(i, "w500")).collect();
    if !logos.is_empty() {
        art.insert(ArtType::ClearLogo, logos);
    }

    let posters: Vec<Candidate> = images
        .posters
        .iter()
        .filter_map(|i| candidate(i, "w500"))
        .collect();
    let keyart: Vec<Candidate> = posters.iter().filter(|c| c.language.is_none()).cloned().collect();
    if !posters.is_empty() {
        art.insert(ArtType::Poster, posters);
    }
    if !keyart.is_empty() {
        art.insert(ArtType::KeyArt, keyart);
    }

    let mut backdrops: Vec<Candidate> = images
        .backdrops
        .iter()
        .filter_map(|i| candidate(i, "w780"))
        .collect();
    backdrops.sort_by_key(|c| backdrop_rank(c.language.as_deref(), preferred));
    let clean: Vec<Candidate> = backdrops.iter().filter(|c| c.language.is_none()).cloned().collect();
    if !clean.is_empty() {
        art.insert(ArtType::Fanart, clean);
    }
    if !backdrops.is_empty() {
        art.insert(ArtType::Landscape, backdrops);
    }

    art
}

/// Episode stills become `thumb`.
pub fn transform_stills(images: &TmdbImages) -> ArtMap {
    let stills: Vec<Candidate> = images.stills.iter().filter_map(|i| candidate(i, "w300")).collect();
    let mut art = ArtMap::new();
    if !stills.is_empty() {
        art.insert(ArtType::Thumb, stills);
    }
    art
}
