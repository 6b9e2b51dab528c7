//! Wire types for provider JSON responses.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

// ── TMDB ────────────────────────────────────────────────────────────────────

/// Body of `/{kind}/{id}/images` and the season/episode image endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TmdbImages {
    pub backdrops: Vec<TmdbImage>,
    pub posters: Vec<TmdbImage>,
    pub logos: Vec<TmdbImage>,
    pub stills: Vec<TmdbImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbImage {
    pub file_path: Option<String>,
    pub width: u32,
    pub height: u32,
    pub vote_average: f64,
    pub vote_count: u32,
    pub iso_639_1: Option<String>,
}

/// The subset of `/movie/{id}` needed to find a movie's collection.
#[derive(Debug, Default, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub belongs_to_collection: Option<TmdbCollectionRef>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbCollectionRef {
    pub id: u64,
}

// ── fanart.tv ───────────────────────────────────────────────────────────────

/// Any fanart.tv `/movies`, `/tv` or `/music` body. Image lists are keyed
/// by fanart.tv type name; everything else is metadata we ignore.
#[derive(Debug, Default, Deserialize)]
pub struct FanartResponse {
    #[serde(default)]
    pub albums: Option<HashMap<String, FanartAlbum>>,
    #[serde(flatten)]
    pub images: HashMap<String, serde_json::Value>,
}

impl FanartResponse {
    /// Image entries under `key`, or nothing if absent or malformed.
    pub fn images_of(&self, key: &str) -> Vec<FanartImage> {
        self.images
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FanartAlbum {
    pub albumcover: Vec<FanartImage>,
    pub cdart: Vec<FanartImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FanartImage {
    pub id: Option<String>,
    pub url: String,
    pub url_thumb: Option<String>,
    pub lang: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub likes: u32,
    pub season: Option<String>,
}

/// fanart.tv sends counts as strings ("12"); accept numbers too.
fn lenient_u32<'de, D: Deserializer<'de>>(de: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0).min(u64::from(u32::MAX)) as u32,
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

// ── TheAudioDB ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AudioDbArtists {
    #[serde(default)]
    pub artists: Option<Vec<AudioDbArtist>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioDbArtist {
    pub str_artist: Option<String>,
    pub str_artist_thumb: Option<String>,
    pub str_artist_logo: Option<String>,
    pub str_artist_banner: Option<String>,
    pub str_artist_fanart: Option<String>,
    pub str_artist_fanart2: Option<String>,
    pub str_artist_fanart3: Option<String>,
    pub str_artist_fanart4: Option<String>,
    pub str_artist_clearart: Option<String>,
    pub str_artist_wide_thumb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AudioDbAlbums {
    #[serde(default)]
    pub album: Option<Vec<AudioDbAlbum>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioDbAlbum {
    #[serde(rename = "strAlbum")]
    pub title: Option<String>,
    #[serde(rename = "strArtist")]
    pub artist: Option<String>,
    #[serde(rename = "strMusicBrainzID")]
    pub musicbrainz_id: Option<String>,
    #[serde(rename = "strAlbumThumb")]
    pub thumb: Option<String>,
    #[serde(rename = "strAlbumCDart")]
    pub cdart: Option<String>,
}
