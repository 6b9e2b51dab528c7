//! Language tag normalisation and per-art-type language policy.

use crate::art::{ArtType, Candidate};

/// Tags providers use to mean "no text on the image".
const NO_LANGUAGE_TAGS: &[&str] = &["", "xx", "00", "none", "null", "zxx"];

/// Normalise a provider language tag.
///
/// Lowercases, strips any region suffix (`pt-BR` -> `pt`), and maps the
/// various "no language" markers to `None`.
pub fn normalize_language_tag(tag: Option<&str>) -> Option<String> {
    let tag = tag?.trim().to_lowercase();
    let base = tag.split(['-', '_']).next().unwrap_or_default();
    if NO_LANGUAGE_TAGS.contains(&base) {
        None
    } else {
        Some(base.to_string())
    }
}

/// How an art type treats candidate languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageRule {
    /// Background art must be text-free.
    NoLanguage,
    /// Prefer the user's language; fall back to everything when none match.
    PreferMatch,
    /// No filtering.
    Any,
}

impl LanguageRule {
    pub fn for_art_type(art_type: ArtType) -> Self {
        match art_type {
            ArtType::Fanart | ArtType::KeyArt => Self::NoLanguage,
            ArtType::Poster
            | ArtType::ClearLogo
            | ArtType::ClearArt
            | ArtType::Banner
            | ArtType::CharacterArt
            | ArtType::DiscArt
            | ArtType::Landscape => Self::PreferMatch,
            ArtType::Thumb => Self::Any,
        }
    }
}

/// Apply the language rule for `art_type` to a candidate list.
///
/// `preferred` should already be normalised. An empty result only happens
/// for [`LanguageRule::NoLanguage`] types when every candidate carries text.
pub fn filter_for_policy(
    art_type: ArtType,
    candidates: &[Candidate],
    preferred: Option<&str>,
) -> Vec<Candidate> {
    match LanguageRule::for_art_type(art_type) {
        LanguageRule::NoLanguage => candidates
            .iter()
            .filter(|c| c.language.is_none())
            .cloned()
            .collect(),
        LanguageRule::PreferMatch => {
            let Some(lang) = preferred else {
                return candidates.to_vec();
            };
            let matched: Vec<Candidate> = candidates
                .iter()
                .filter(|c| c.language.as_deref() == Some(lang))
                .cloned()
                .collect();
            if matched.is_empty() {
                candidates.to_vec()
            } else {
                matched
            }
        }
        LanguageRule::Any => candidates.to_vec(),
    }
}

/// Distinct languages present in a list, text-free (`None`) first.
pub fn available_languages(candidates: &[Candidate]) -> Vec<Option<String>> {
    let mut langs: Vec<Option<String>> = Vec::new();
    for c in candidates {
        if !langs.contains(&c.language) {
            langs.push(c.language.clone());
        }
    }
    langs.sort();
    langs
}
