//! Popularity ranking for merged candidate lists.

use std::cmp::Ordering;

use crate::art::{ArtMap, ArtType, Candidate};

/// Bayesian prior weight (number of "virtual" votes).
const PRIOR_VOTES: f64 = 3.0;
/// Bayesian prior mean rating.
const PRIOR_RATING: f64 = 2.3;
/// Scale factor bringing community likes onto the rating range.
const LIKES_SCALE: f64 = 0.73;

/// Popularity score for one candidate.
///
/// Rated items use a weighted average so a single 10/10 vote cannot beat
/// a well-voted 5.5. Items that only carry likes are scaled onto the same
/// range. Unrated, unvoted items sit at the prior.
pub fn popularity_score(c: &Candidate) -> f64 {
    if c.rating > 0.0 {
        let v = f64::from(c.vote_count);
        (v / (v + PRIOR_VOTES)) * c.rating + (PRIOR_VOTES / (v + PRIOR_VOTES)) * PRIOR_RATING
    } else if c.likes > 0 {
        f64::from(c.likes) * LIKES_SCALE
    } else if c.vote_count == 0 {
        PRIOR_RATING
    } else {
        0.0
    }
}

fn language_rank(art_type: ArtType, c: &Candidate, preferred: Option<&str>) -> u8 {
    if art_type == ArtType::Fanart {
        return 0;
    }
    match (&c.language, preferred) {
        (Some(lang), Some(pref)) if lang == pref => 0,
        (None, _) => 1,
        _ => 2,
    }
}

/// Sort candidates best-first: language match, then popularity, then resolution.
pub fn sort_candidates(art_type: ArtType, candidates: &mut [Candidate], preferred: Option<&str>) {
    candidates.sort_by(|a, b| {
        language_rank(art_type, a, preferred)
            .cmp(&language_rank(art_type, b, preferred))
            .then_with(|| {
                popularity_score(b)
                    .partial_cmp(&popularity_score(a))
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.pixels().cmp(&a.pixels()))
    });
}

/// Rank every list in an art map in place.
pub fn rank_art_map(art: &mut ArtMap, preferred: Option<&str>) {
    for (art_type, list) in art.iter_mut() {
        sort_candidates(*art_type, list, preferred);
    }
}

/// Best candidate after ranking, if any.
pub fn best_candidate(
    art_type: ArtType,
    candidates: &[Candidate],
    preferred: Option<&str>,
) -> Option<Candidate> {
    let mut sorted = candidates.to_vec();
    sort_candidates(art_type, &mut sorted, preferred);
    sorted.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::Provider;

    #[test]
    fn single_vote_does_not_dominate() {
        let lucky = Candidate::new("lucky", Provider::Tmdb).with_votes(10.0, 1);
        let solid = Candidate::new("solid", Provider::Tmdb).with_votes(5.5, 40);
        assert!(popularity_score(&solid) > popularity_score(&lucky));
    }

    #[test]
    fn likes_are_scaled() {
        let c = Candidate::new("x", Provider::FanartTv).with_likes(10);
        assert!((popularity_score(&c) - 7.3).abs() < 1e-9);
    }

    #[test]
    fn unrated_unvoted_sits_at_prior() {
        let c = Candidate::new("x", Provider::AudioDb);
        assert!((popularity_score(&c) - PRIOR_RATING).abs() < 1e-9);
    }

    #[test]
    fn language_beats_popularity_then_resolution_breaks_ties() {
        let mut list = vec![
            Candidate::new("de-popular", Provider::Tmdb)
                .with_language(Some("de"))
                .with_votes(9.0, 100),
            Candidate::new("en-small", Provider::Tmdb)
                .with_language(Some("en"))
                .with_votes(5.0, 10)
                .with_size(500, 750),
            Candidate::new("en-large", Provider::Tmdb)
                .with_language(Some("en"))
                .with_votes(5.0, 10)
                .with_size(1000, 1500),
            Candidate::new("none", Provider::Tmdb).with_votes(9.0, 100),
        ];
        sort_candidates(ArtType::Poster, &mut list, Some("en"));
        let order: Vec<&str> = list.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(order, ["en-large", "en-small", "none", "de-popular"]);
    }

    #[test]
    fn fanart_ignores_language_rank() {
        let list = vec![
            Candidate::new("en", Provider::Tmdb)
                .with_language(Some("en"))
                .with_votes(4.0, 5),
            Candidate::new("none", Provider::Tmdb).with_votes(8.0, 50),
        ];
        let best = best_candidate(ArtType::Fanart, &list, Some("en")).unwrap();
        assert_eq!(best.url, "none");
    }
}
