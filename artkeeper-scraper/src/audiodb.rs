//! TheAudioDB client.

use artkeeper_core::{ArtMap, ArtType, Candidate, Provider};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::Duration;

use crate::error::ScrapeError;
use crate::http::ApiClient;
use crate::provider::{AlbumRecord, MusicCatalog};
use crate::types::{AudioDbAlbum, AudioDbAlbums, AudioDbArtist, AudioDbArtists};

const BASE_URL: &str = "https://www.theaudiodb.com/api/v1/json";

/// TheAudioDB's public test key, used when none is configured.
pub const PUBLIC_API_KEY: &str = "123";

pub struct AudioDbClient {
    api: ApiClient,
    base: String,
}

impl AudioDbClient {
    pub fn new(api_key: Option<&str>) -> Result<Self, ScrapeError> {
        let key = api_key.filter(|k| !k.trim().is_empty()).unwrap_or(PUBLIC_API_KEY);
        Ok(Self {
            api: ApiClient::new("TheAudioDB", 30, Duration::from_secs(60))?,
            base: format!("{BASE_URL}/{key}"),
        })
    }

    pub fn with_cancel(mut self, flag: std::sync::Arc<std::sync::atomic::AtomicBool>) -> Self {
        self.api = self.api.with_cancel(flag);
        self
    }

    async fn first_album(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<AudioDbAlbum>, ScrapeError> {
        let body: Option<AudioDbAlbums> = self
            .api
            .get_json(&format!("{}/{endpoint}", self.base), query, &[])
            .await?;
        Ok(body
            .and_then(|b| b.album)
            .and_then(|albums| albums.into_iter().next()))
    }
}

impl MusicCatalog for AudioDbClient {
    fn artist_art<'a>(&'a self, mbid: &'a str) -> BoxFuture<'a, Result<ArtMap, ScrapeError>> {
        async move {
            let body: Option<AudioDbArtists> = self
                .api
                .get_json(&format!("{}/artist-mb.php", self.base), &[("i", mbid)], &[])
                .await?;
            Ok(body
                .and_then(|b| b.artists)
                .and_then(|artists| artists.into_iter().next())
                .map(|a| artist_art_from(&a))
                .unwrap_or_default())
        }
        .boxed()
    }

    fn album<'a>(
        &'a self,
        release_group: &'a str,
    ) -> BoxFuture<'a, Result<Option<AlbumRecord>, ScrapeError>> {
        async move {
            Ok(self
                .first_album("album-mb.php", &[("i", release_group)])
                .await?
                .map(|a| album_record_from(&a)))
        }
        .boxed()
    }

    fn search_album<'a>(
        &'a self,
        artist: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, Result<Option<AlbumRecord>, ScrapeError>> {
        async move {
            let artist = straighten_quotes(artist);
            let title = straighten_quotes(title);
            Ok(self
                .first_album("searchalbum.php", &[("s", &artist), ("a", &title)])
                .await?
                .map(|a| album_record_from(&a)))
        }
        .boxed()
    }
}

/// Library titles often carry typographic apostrophes the search rejects.
pub fn straighten_quotes(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}'], "'")
}

fn push(art: &mut ArtMap, art_type: ArtType, url: Option<&String>) {
    let Some(url) = url.map(|u| u.trim()).filter(|u| !u.is_empty()) else {
        return;
    };
    let mut c = Candidate::new(url, Provider::AudioDb);
    c.preview_url = Some(format!("{url}/preview"));
    art.entry(art_type).or_default().push(c);
}

pub fn artist_art_from(artist: &AudioDbArtist) -> ArtMap {
    let mut art = ArtMap::new();
    push(&mut art, ArtType::Thumb, artist.str_artist_thumb.as_ref());
    push(&mut art, ArtType::ClearLogo, artist.str_artist_logo.as_ref());
    push(&mut art, ArtType::Banner, artist.str_artist_banner.as_ref());
    for fanart in [
        &artist.str_artist_fanart,
        &artist.str_artist_fanart2,
        &artist.str_artist_fanart3,
        &artist.str_artist_fanart4,
    ] {
        push(&mut art, ArtType::Fanart, fanart.as_ref());
    }
    push(&mut art, ArtType::ClearArt, artist.str_artist_clearart.as_ref());
    push(&mut art, ArtType::Landscape, artist.str_artist_wide_thumb.as_ref());
    art
}

pub fn album_record_from(album: &AudioDbAlbum) -> AlbumRecord {
    let mut art = ArtMap::new();
    push(&mut art, ArtType::Thumb, album.thumb.as_ref());
    push(&mut art, ArtType::DiscArt, album.cdart.as_ref());
    AlbumRecord {
        musicbrainz_id: album
            .musicbrainz_id
            .clone()
            .filter(|id| !id.trim().is_empty()),
        art,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artist_fields_map_to_art_types() {
        let body: AudioDbArtists = serde_json::from_str(
            r#"{"artists": [{
                "strArtist": "Band",
                "strArtistThumb": "https://r2.theaudiodb.com/images/media/artist/thumb/t.jpg",
                "strArtistFanart": "https://r2.theaudiodb.com/images/media/artist/fanart/f1.jpg",
                "strArtistFanart2": "https://r2.theaudiodb.com/images/media/artist/fanart/f2.jpg",
                "strArtistFanart3": "",
                "strArtistFanart4": null,
                "strArtistLogo": null,
                "strArtistWideThumb": "https://r2.theaudiodb.com/images/media/artist/widethumb/w.jpg"
            }]}"#,
        )
        .unwrap();
        let art = artist_art_from(&body.artists.unwrap()[0]);
        assert_eq!(art[&ArtType::Fanart].len(), 2);
        assert!(!art.contains_key(&ArtType::ClearLogo));
        assert_eq!(
            art[&ArtType::Thumb][0].preview_url.as_deref(),
            Some("https://r2.theaudiodb.com/images/media/artist/thumb/t.jpg/preview")
        );
        assert_eq!(art[&ArtType::Landscape].len(), 1);
    }

    #[test]
    fn album_record_carries_musicbrainz_id() {
        let body: AudioDbAlbums = serde_json::from_str(
            r#"{"album": [{
                "strAlbum": "Record",
                "strArtist": "Band",
                "strMusicBrainzID": "rg-old",
                "strAlbumThumb": "https://r2.theaudiodb.com/images/media/album/thumb/a.jpg",
                "strAlbumCDart": "https://r2.theaudiodb.com/images/media/album/cdart/c.png"
            }]}"#,
        )
        .unwrap();
        let record = album_record_from(&body.album.unwrap()[0]);
        assert_eq!(record.musicbrainz_id.as_deref(), Some("rg-old"));
        assert_eq!(record.art[&ArtType::DiscArt].len(), 1);
    }

    #[test]
    fn null_album_list_parses() {
        let body: AudioDbAlbums = serde_json::from_str(r#"{"album": null}"#).unwrap();
        assert!(body.album.is_none());
    }

    #[test]
    fn quotes_are_straightened() {
        assert_eq!(straighten_quotes("Don\u{2019}t Stop"), "Don't Stop");
    }
}
