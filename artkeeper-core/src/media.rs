use serde::{Deserialize, Serialize};

use crate::art::ArtType;

/// Library media kinds that can carry artwork.
///
/// This enum is the single dispatch point for kind-specific behaviour:
/// default art types, scan scopes, and (in the scraper crate) the fetch
/// strategy table are all keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    TvShow,
    Season,
    Episode,
    MusicVideo,
    Set,
    Artist,
    Album,
}

/// All media kinds in scan enumeration order.
const ALL_KINDS: &[MediaKind] = &[
    MediaKind::Movie,
    MediaKind::Set,
    MediaKind::TvShow,
    MediaKind::Season,
    MediaKind::Episode,
    MediaKind::MusicVideo,
    MediaKind::Artist,
    MediaKind::Album,
];

impl MediaKind {
    /// Canonical short name used in the store, CLI arguments, and cache keys.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tvshow",
            Self::Season => "season",
            Self::Episode => "episode",
            Self::MusicVideo => "musicvideo",
            Self::Set => "set",
            Self::Artist => "artist",
            Self::Album => "album",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::TvShow => "TV Show",
            Self::Season => "Season",
            Self::Episode => "Episode",
            Self::MusicVideo => "Music Video",
            Self::Set => "Movie Set",
            Self::Artist => "Artist",
            Self::Album => "Album",
        }
    }

    /// Accepted names for parsing (case-insensitive). First entry is the short name.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Movie => &["movie", "movies", "film"],
            Self::TvShow => &["tvshow", "tvshows", "show", "tv"],
            Self::Season => &["season", "seasons"],
            Self::Episode => &["episode", "episodes"],
            Self::MusicVideo => &["musicvideo", "musicvideos", "mv"],
            Self::Set => &["set", "sets", "collection", "movieset"],
            Self::Artist => &["artist", "artists"],
            Self::Album => &["album", "albums"],
        }
    }

    /// Art types requested for this kind when scanning for missing artwork,
    /// already in processing priority order.
    pub fn default_art_types(&self) -> &'static [ArtType] {
        use ArtType::*;
        match self {
            Self::Movie | Self::Set => &[
                Poster, Fanart, ClearLogo, ClearArt, Banner, Landscape, DiscArt, KeyArt,
            ],
            Self::TvShow => &[
                Poster,
                Fanart,
                ClearLogo,
                ClearArt,
                Banner,
                Landscape,
                CharacterArt,
            ],
            Self::Season => &[Poster, Fanart, Banner, Landscape],
            Self::Episode => &[Thumb],
            Self::MusicVideo => &[
                Poster, Fanart, ClearLogo, ClearArt, Banner, Landscape, KeyArt,
            ],
            Self::Artist => &[Fanart, ClearLogo, Banner, Thumb],
            Self::Album => &[DiscArt, Thumb],
        }
    }

    /// Whether this kind is resolved through a parent item (season, episode).
    pub fn has_parent(&self) -> bool {
        matches!(self, Self::Season | Self::Episode)
    }

    /// All kinds in scan enumeration order.
    pub fn all() -> &'static [MediaKind] {
        ALL_KINDS
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Error returned when a string cannot be parsed into a `MediaKind` or `ScanScope`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media kind: '{0}'")]
pub struct MediaKindParseError(pub String);

impl std::str::FromStr for MediaKind {
    type Err = MediaKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.aliases().contains(&lower.as_str()))
            .ok_or_else(|| MediaKindParseError(s.to_string()))
    }
}

/// A named group of media kinds a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanScope {
    Movies,
    TvShows,
    Music,
    MusicVideos,
    All,
}

impl ScanScope {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::TvShows => "tvshows",
            Self::Music => "music",
            Self::MusicVideos => "musicvideos",
            Self::All => "all",
        }
    }

    /// Media kinds covered by this scope, in scan order.
    pub fn kinds(&self) -> &'static [MediaKind] {
        match self {
            Self::Movies => &[MediaKind::Movie, MediaKind::Set],
            Self::TvShows => &[MediaKind::TvShow, MediaKind::Season, MediaKind::Episode],
            Self::Music => &[MediaKind::Artist, MediaKind::Album],
            Self::MusicVideos => &[MediaKind::MusicVideo],
            Self::All => ALL_KINDS,
        }
    }
}

impl std::fmt::Display for ScanScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ScanScope {
    type Err = MediaKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movies" | "movie" => Ok(Self::Movies),
            "tvshows" | "tvshow" | "tv" => Ok(Self::TvShows),
            "music" => Ok(Self::Music),
            "musicvideos" | "musicvideo" => Ok(Self::MusicVideos),
            "all" => Ok(Self::All),
            _ => Err(MediaKindParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_round_trip() {
        for &kind in MediaKind::all() {
            let parsed: MediaKind = kind.short_name().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn short_name_is_first_alias() {
        for &kind in MediaKind::all() {
            assert_eq!(kind.short_name(), kind.aliases()[0], "{:?}", kind);
        }
    }

    #[test]
    fn aliases_parse_case_insensitively() {
        assert_eq!("TV".parse::<MediaKind>().unwrap(), MediaKind::TvShow);
        assert_eq!("Collection".parse::<MediaKind>().unwrap(), MediaKind::Set);
        assert!("podcast".parse::<MediaKind>().is_err());
    }

    #[test]
    fn default_art_types_follow_priority_order() {
        for &kind in MediaKind::all() {
            let types = kind.default_art_types();
            let mut sorted = types.to_vec();
            sorted.sort();
            assert_eq!(types, sorted.as_slice(), "{:?} art types out of order", kind);
        }
    }

    #[test]
    fn tvshow_scope_includes_seasons_and_episodes() {
        let kinds = ScanScope::TvShows.kinds();
        assert!(kinds.contains(&MediaKind::Season));
        assert!(kinds.contains(&MediaKind::Episode));
        assert_eq!(ScanScope::All.kinds().len(), 8);
    }
}
