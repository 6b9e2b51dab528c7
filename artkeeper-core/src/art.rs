use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Artwork slot types.
///
/// Variant order is processing priority: within one queue entry, art types
/// are always handled poster first, then fanart, clearlogo, and so on. The
/// derived `Ord` relies on this, so new variants must be inserted at the
/// right rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtType {
    Poster,
    Fanart,
    ClearLogo,
    ClearArt,
    Banner,
    Landscape,
    CharacterArt,
    DiscArt,
    KeyArt,
    Thumb,
}

const ALL_ART_TYPES: &[ArtType] = &[
    ArtType::Poster,
    ArtType::Fanart,
    ArtType::ClearLogo,
    ArtType::ClearArt,
    ArtType::Banner,
    ArtType::Landscape,
    ArtType::CharacterArt,
    ArtType::DiscArt,
    ArtType::KeyArt,
    ArtType::Thumb,
];

impl ArtType {
    /// Slot name as stored in the library and the queue tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Fanart => "fanart",
            Self::ClearLogo => "clearlogo",
            Self::ClearArt => "clearart",
            Self::Banner => "banner",
            Self::Landscape => "landscape",
            Self::CharacterArt => "characterart",
            Self::DiscArt => "discart",
            Self::KeyArt => "keyart",
            Self::Thumb => "thumb",
        }
    }

    /// Numeric priority (1 = first). Stable across releases; used for display.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Poster => 1,
            Self::Fanart => 2,
            Self::ClearLogo => 3,
            Self::ClearArt => 4,
            Self::Banner => 5,
            Self::Landscape => 6,
            Self::CharacterArt => 7,
            Self::DiscArt => 8,
            Self::KeyArt => 9,
            Self::Thumb => 99,
        }
    }

    pub fn all() -> &'static [ArtType] {
        ALL_ART_TYPES
    }
}

impl std::fmt::Display for ArtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown art type: '{0}'")]
pub struct ArtTypeParseError(pub String);

impl std::str::FromStr for ArtType {
    type Err = ArtTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ALL_ART_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| ArtTypeParseError(s.to_string()))
    }
}

/// Artwork providers. `System` is reserved for bookkeeping cache rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "tmdb")]
    Tmdb,
    #[serde(rename = "fanarttv")]
    FanartTv,
    #[serde(rename = "theaudiodb")]
    AudioDb,
    #[serde(rename = "system")]
    System,
}

impl Provider {
    /// Key used in the cache table's `source` column.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Self::Tmdb => "tmdb",
            Self::FanartTv => "fanarttv",
            Self::AudioDb => "theaudiodb",
            Self::System => "system",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tmdb => "TMDB",
            Self::FanartTv => "fanart.tv",
            Self::AudioDb => "TheAudioDB",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One candidate image offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Average vote (TMDB scale 0-10). Zero when the provider has no ratings.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub vote_count: u32,
    /// Community likes (fanart.tv).
    #[serde(default)]
    pub likes: u32,
    /// Normalised language tag; `None` means text-free.
    #[serde(default)]
    pub language: Option<String>,
    pub provider: Provider,
    /// Season number for season-scoped community art.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, provider: Provider) -> Self {
        Self {
            url: url.into(),
            preview_url: None,
            width: 0,
            height: 0,
            rating: 0.0,
            vote_count: 0,
            likes: 0,
            language: None,
            provider,
            season: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = crate::language::normalize_language_tag(language);
        self
    }

    pub fn with_votes(mut self, rating: f64, vote_count: u32) -> Self {
        self.rating = rating;
        self.vote_count = vote_count;
        self
    }

    pub fn with_likes(mut self, likes: u32) -> Self {
        self.likes = likes;
        self
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Candidates grouped by art type. `BTreeMap` keeps iteration in priority order.
pub type ArtMap = BTreeMap<ArtType, Vec<Candidate>>;

/// Append every candidate list from `other` into `into`.
pub fn merge_art(into: &mut ArtMap, other: ArtMap) {
    for (art_type, candidates) in other {
        if candidates.is_empty() {
            continue;
        }
        into.entry(art_type).or_default().extend(candidates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_priority() {
        let mut types = ArtType::all().to_vec();
        types.reverse();
        types.sort();
        assert_eq!(types, ArtType::all());
        for pair in ArtType::all().windows(2) {
            assert!(pair[0].priority() < pair[1].priority());
        }
    }

    #[test]
    fn parse_art_type() {
        assert_eq!("ClearLogo".parse::<ArtType>().unwrap(), ArtType::ClearLogo);
        assert!("cutout".parse::<ArtType>().is_err());
    }

    #[test]
    fn candidate_serialises_provider_as_cache_key() {
        let c = Candidate::new("https://example.org/a.jpg", Provider::FanartTv);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"provider\":\"fanarttv\""));
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn merge_skips_empty_lists() {
        let mut a = ArtMap::new();
        a.insert(
            ArtType::Poster,
            vec![Candidate::new("p1", Provider::Tmdb)],
        );
        let mut b = ArtMap::new();
        b.insert(
            ArtType::Poster,
            vec![Candidate::new("p2", Provider::FanartTv)],
        );
        b.insert(ArtType::Banner, Vec::new());
        merge_art(&mut a, b);
        assert_eq!(a[&ArtType::Poster].len(), 2);
        assert!(!a.contains_key(&ArtType::Banner));
    }
}
