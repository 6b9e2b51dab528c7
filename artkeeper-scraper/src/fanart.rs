//! fanart.tv client.

use artkeeper_core::{ArtMap, ArtType, Candidate, Provider};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::Duration;

use crate::error::ScrapeError;
use crate::http::ApiClient;
use crate::provider::{CommunityArt, MusicArt};
use crate::types::{FanartImage, FanartResponse};

const BASE_URL: &str = "https://webservice.fanart.tv/v3";

/// fanart.tv type name, target art type, nominal (width, height).
pub type TypeMapping = (&'static str, ArtType, (u32, u32));

const MOVIE_TYPES: &[TypeMapping] = &[
    ("movieposter", ArtType::Poster, (1000, 1426)),
    ("moviebackground", ArtType::Fanart, (1920, 1080)),
    ("moviebackground4k", ArtType::Fanart, (3840, 2160)),
    ("hdmovielogo", ArtType::ClearLogo, (800, 310)),
    ("movielogo", ArtType::ClearLogo, (400, 155)),
    ("hdmovieclearart", ArtType::ClearArt, (1000, 562)),
    ("movieclearart", ArtType::ClearArt, (1000, 562)),
    ("moviebanner", ArtType::Banner, (1000, 185)),
    ("moviedisc", ArtType::DiscArt, (1000, 1000)),
    ("moviethumb", ArtType::Landscape, (1000, 562)),
];

const TV_TYPES: &[TypeMapping] = &[
    ("tvposter", ArtType::Poster, (1000, 1426)),
    ("showbackground", ArtType::Fanart, (1920, 1080)),
    ("showbackground4k", ArtType::Fanart, (3840, 2160)),
    ("hdtvlogo", ArtType::ClearLogo, (800, 310)),
    ("clearlogo", ArtType::ClearLogo, (400, 155)),
    ("hdclearart", ArtType::ClearArt, (1000, 562)),
    ("clearart", ArtType::ClearArt, (1000, 562)),
    ("tvbanner", ArtType::Banner, (1000, 185)),
    ("tvthumb", ArtType::Landscape, (1000, 562)),
    ("characterart", ArtType::CharacterArt, (1000, 1399)),
];

const SEASON_TYPES: &[TypeMapping] = &[
    ("seasonposter", ArtType::Poster, (1000, 1426)),
    ("seasonbanner", ArtType::Banner, (1000, 185)),
    ("seasonthumb", ArtType::Landscape, (1000, 562)),
];

const ARTIST_TYPES: &[TypeMapping] = &[
    ("artistthumb", ArtType::Thumb, (1000, 1000)),
    ("artistbackground", ArtType::Fanart, (1920, 1080)),
    ("hdmusiclogo", ArtType::ClearLogo, (800, 310)),
    ("musiclogo", ArtType::ClearLogo, (400, 155)),
    ("musicbanner", ArtType::Banner, (1000, 185)),
];

/// Banners have no separate preview rendition.
const FULL_URL_PREVIEW: &[&str] = &["moviebanner", "tvbanner", "seasonbanner", "musicbanner"];

pub struct FanartClient {
    api: ApiClient,
    api_key: String,
}

impl FanartClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ScrapeError> {
        Ok(Self {
            api: ApiClient::new("fanart.tv", 10, Duration::from_secs(1))?,
            api_key: api_key.into(),
        })
    }

    pub fn with_cancel(mut self, flag: std::sync::Arc<std::sync::atomic::AtomicBool>) -> Self {
        self.api = self.api.with_cancel(flag);
        self
    }

    async fn request(&self, path: &str) -> Result<Option<FanartResponse>, ScrapeError> {
        self.api
            .get_json(
                &format!("{BASE_URL}{path}"),
                &[],
                &[("api-key", self.api_key.as_str())],
            )
            .await
    }
}

impl CommunityArt for FanartClient {
    fn movie_art<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            Ok(self
                .request(&format!("/movies/{id}"))
                .await?
                .map(|r| map_types(&r, MOVIE_TYPES, None))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn tv_art<'a>(&'a self, tvdb_id: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            Ok(self
                .request(&format!("/tv/{tvdb_id}"))
                .await?
                .map(|r| map_types(&r, TV_TYPES, None))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn season_art<'a>(
        &'a self,
        tvdb_id: &'a str,
        season: u32,
    ) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            Ok(self
                .request(&format!("/tv/{tvdb_id}"))
                .await?
                .map(|r| map_types(&r, SEASON_TYPES, Some(season)))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn music_art<'a>(
        &'a self,
        artist_mbid: &'a str,
    ) -> BoxFuture<'a, Result<MusicArt, ScrapeError>> {
        async move {
            Ok(self
                .request(&format!("/music/{artist_mbid}"))
                .await?
                .map(|r| music_art_from(&r))
                .unwrap_or_default())
        }
        .boxed()
    }
}

fn candidate(image: &FanartImage, fanart_type: &str, size: (u32, u32)) -> Option<Candidate> {
    if image.url.is_empty() {
        return None;
    }
    let preview = if FULL_URL_PREVIEW.contains(&fanart_type) {
        image.url.clone()
    } else {
        image
            .url_thumb
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| image.url.replace("/fanart/", "/preview/"))
    };
    let mut c = Candidate::new(image.url.clone(), Provider::FanartTv)
        .with_size(size.0, size.1)
        .with_language(image.lang.as_deref())
        .with_likes(image.likes);
    c.preview_url = Some(preview);
    c.season = image.season.as_deref().and_then(|s| s.parse().ok());
    Some(c)
}

/// Season filter: entries tagged with that season number or "all".
fn matches_season(image: &FanartImage, season: u32) -> bool {
    match image.season.as_deref() {
        Some("all") => true,
        Some(s) => s.parse::<u32>().ok() == Some(season),
        None => false,
    }
}

/// Map the listed fanart.tv types of a response to art types.
pub fn map_types(resp: &FanartResponse, types: &[TypeMapping], season: Option<u32>) -> ArtMap {
    let mut art = ArtMap::new();
    for (fanart_type, art_type, size) in types {
        let found: Vec<Candidate> = resp
            .images_of(fanart_type)
            .iter()
            .filter(|img| season.is_none_or(|n| matches_season(img, n)))
            .filter_map(|img| candidate(img, fanart_type, *size))
            .collect();
        if !found.is_empty() {
            art.entry(*art_type).or_default().extend(found);
        }
    }
    art
}

/// Artist art plus per-release-group album art from a `/music` body.
pub fn music_art_from(resp: &FanartResponse) -> MusicArt {
    let artist = map_types(resp, ARTIST_TYPES, None);
    let mut albums = std::collections::HashMap::new();
    for (release_group, album) in resp.albums.iter().flatten() {
        let mut art = ArtMap::new();
        let covers: Vec<Candidate> = album
            .albumcover
            .iter()
            .filter_map(|i| candidate(i, "albumcover", (1000, 1000)))
            .collect();
        let discs: Vec<Candidate> = album
            .cdart
            .iter()
            .filter_map(|i| candidate(i, "cdart", (1000, 1000)))
            .collect();
        if !covers.is_empty() {
            art.insert(ArtType::Thumb, covers);
        }
        if !discs.is_empty() {
            art.insert(ArtType::DiscArt, discs);
        }
        albums.insert(release_group.clone(), art);
    }
    MusicArt { artist, albums }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TV_FIXTURE: &str = r#"{
        "name": "Example Show",
        "thetvdb_id": "121361",
        "hdtvlogo": [
            {"id": "1", "url": "https://assets.fanart.tv/fanart/tv/121361/hdtvlogo/a.png", "lang": "en", "likes": "7"}
        ],
        "tvbanner": [
            {"id": "2", "url": "https://assets.fanart.tv/fanart/tv/121361/tvbanner/b.jpg", "lang": "en", "likes": "1"}
        ],
        "showbackground": [
            {"id": "3", "url": "https://assets.fanart.tv/fanart/tv/121361/showbackground/c.jpg", "lang": "", "likes": 2, "season": "all"}
        ],
        "seasonposter": [
            {"id": "4", "url": "https://assets.fanart.tv/fanart/tv/121361/seasonposter/s1.jpg", "lang": "en", "likes": "3", "season": "1"},
            {"id": "5", "url": "https://assets.fanart.tv/fanart/tv/121361/seasonposter/s2.jpg", "lang": "en", "likes": "0", "season": "2"},
            {"id": "6", "url": "https://assets.fanart.tv/fanart/tv/121361/seasonposter/sa.jpg", "lang": "en", "likes": "0", "season": "all"}
        ]
    }"#;

    #[test]
    fn tv_types_map_with_sizes_and_previews() {
        let resp: FanartResponse = serde_json::from_str(TV_FIXTURE).unwrap();
        let art = map_types(&resp, TV_TYPES, None);

        let logo = &art[&ArtType::ClearLogo][0];
        assert_eq!((logo.width, logo.height), (800, 310));
        assert_eq!(logo.likes, 7);
        assert_eq!(
            logo.preview_url.as_deref(),
            Some("https://assets.fanart.tv/preview/tv/121361/hdtvlogo/a.png")
        );

        let banner = &art[&ArtType::Banner][0];
        assert_eq!(banner.preview_url.as_deref(), Some(banner.url.as_str()));

        let fanart = &art[&ArtType::Fanart][0];
        assert!(fanart.language.is_none());
        assert_eq!(fanart.likes, 2);

        assert!(!art.contains_key(&ArtType::Poster), "season posters are not show posters");
    }

    #[test]
    fn season_filter_keeps_matching_and_all() {
        let resp: FanartResponse = serde_json::from_str(TV_FIXTURE).unwrap();
        let art = map_types(&resp, SEASON_TYPES, Some(1));
        let urls: Vec<&str> = art[&ArtType::Poster]
            .iter()
            .map(|c| c.url.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(urls, vec!["s1.jpg", "sa.jpg"]);
        assert_eq!(art[&ArtType::Poster][0].season, Some(1));
    }

    #[test]
    fn music_albums_keyed_by_release_group() {
        let resp: FanartResponse = serde_json::from_str(
            r#"{
                "name": "Band",
                "artistthumb": [{"id": "1", "url": "https://assets.fanart.tv/fanart/music/x/artistthumb/t.jpg", "likes": "4"}],
                "musiclogo": [{"id": "2", "url": "https://assets.fanart.tv/fanart/music/x/musiclogo/l.png", "likes": "0"}],
                "albums": {
                    "rg-old": {
                        "albumcover": [{"id": "3", "url": "https://assets.fanart.tv/fanart/music/x/albumcover/c.jpg", "likes": "1"}],
                        "cdart": [{"id": "4", "url": "https://assets.fanart.tv/fanart/music/x/cdart/d.png", "likes": "0"}]
                    }
                }
            }"#,
        )
        .unwrap();
        let music = music_art_from(&resp);
        assert_eq!(music.artist[&ArtType::Thumb].len(), 1);
        assert_eq!(music.artist[&ArtType::ClearLogo][0].width, 400);
        let album = &music.albums["rg-old"];
        assert_eq!(album[&ArtType::Thumb].len(), 1);
        assert_eq!(album[&ArtType::DiscArt].len(), 1);
    }

    #[test]
    fn malformed_type_list_is_ignored() {
        let resp: FanartResponse =
            serde_json::from_str(r#"{"movieposter": "oops", "moviedisc": []}"#).unwrap();
        assert!(map_types(&resp, MOVIE_TYPES, None).is_empty());
    }
}
