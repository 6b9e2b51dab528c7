use super::*;
use std::collections::VecDeque;
use std::sync::Arc;

use artkeeper_core::{LibraryHost, MediaKind, QueueStatus, SessionStatus};
use artkeeper_db as db;

use crate::scanner::{ScanOptions, ScanSummary};
use crate::test_support::{FakeTmdb, movie, no_progress, pipeline};

/// Answers from a fixed script and records what it was shown.
struct Scripted {
    answers: VecDeque<ReviewChoice>,
    seen: Vec<(String, ArtType, usize)>,
}

impl Scripted {
    fn new(answers: impl IntoIterator<Item = ReviewChoice>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            seen: Vec::new(),
        }
    }
}

impl Reviewer for Scripted {
    fn choose(&mut self, prompt: &ReviewPrompt<'_>) -> ReviewChoice {
        self.seen.push((
            prompt.item.title.clone(),
            prompt.art_type,
            prompt.candidates.len(),
        ));
        self.answers.pop_front().unwrap_or(ReviewChoice::Quit)
    }
}

fn scan(pipeline: &Pipeline, art_types: &[ArtType]) -> ScanSummary {
    let opts = ScanOptions {
        art_types: Some(art_types.to_vec()),
        ..ScanOptions::default()
    };
    pipeline.scan(&[MediaKind::Movie], &opts, &no_progress).unwrap()
}

fn poster_of(host: &crate::host::JsonLibrary, dbid: i64) -> Option<String> {
    host.get_item(MediaKind::Movie, dbid)
        .unwrap()
        .and_then(|item| item.art.get(&ArtType::Poster).cloned())
}

#[tokio::test]
async fn reviewer_choice_is_applied() {
    let items = vec![movie(1, "Alpha", Some("11")), movie(2, "Beta", None)];
    let (pipeline, host) = pipeline(items, Arc::new(FakeTmdb::posters(3)));
    let session_id = scan(&pipeline, &[ArtType::Poster]).session_id;

    let mut reviewer = Scripted::new([ReviewChoice::Apply(0)]);
    let report = pipeline
        .review(session_id, &mut reviewer, ReviewOptions::default(), &no_progress)
        .await
        .unwrap();

    // Beta has nothing to choose from and is never shown.
    assert_eq!(reviewer.seen, vec![("Alpha".to_string(), ArtType::Poster, 3)]);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped_no_candidates, 1);
    assert_eq!(
        poster_of(&host, 1).as_deref(),
        Some("https://img.test/11/poster0.jpg")
    );

    let session = pipeline.session(session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.stats.applied, 1);
    assert_eq!(session.stats.auto, 0);
    assert_eq!(session.stats.review_mode.as_deref(), Some("manual"));
    assert_eq!(session.stats.details.manual_applied.len(), 1);
}

#[tokio::test]
async fn filled_slot_is_never_offered() {
    let (pipeline, host) = pipeline(vec![movie(1, "Alpha", Some("11"))], Arc::new(FakeTmdb::posters(3)));
    let session_id = scan(&pipeline, &[ArtType::Poster]).session_id;

    let mut art = std::collections::BTreeMap::new();
    art.insert(ArtType::Poster, "https://elsewhere.test/p.jpg".to_string());
    host.set_artwork(MediaKind::Movie, 1, &art).unwrap();

    let mut reviewer = Scripted::new([ReviewChoice::Apply(0)]);
    let report = pipeline
        .review(session_id, &mut reviewer, ReviewOptions::default(), &no_progress)
        .await
        .unwrap();

    assert!(reviewer.seen.is_empty());
    assert_eq!(report.stale, 1);
    assert_eq!(
        poster_of(&host, 1).as_deref(),
        Some("https://elsewhere.test/p.jpg")
    );
}

#[tokio::test]
async fn quit_and_resume_continues_where_it_stopped() {
    let items = vec![movie(1, "Alpha", Some("11")), movie(2, "Charlie", Some("44"))];
    let (pipeline, host) = pipeline(items, Arc::new(FakeTmdb::posters(3)));
    let session_id = scan(&pipeline, &[ArtType::Poster]).session_id;

    let mut first = Scripted::new([ReviewChoice::Apply(0), ReviewChoice::Quit]);
    let report = pipeline
        .review(session_id, &mut first, ReviewOptions::default(), &no_progress)
        .await
        .unwrap();
    assert!(report.paused);
    assert_eq!(report.applied, 1);

    let session = pipeline.session(session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.stats.applied, 1);
    let pending = pipeline
        .store()
        .with(|c| db::get_next_batch(c, 10, &[MediaKind::Movie]))
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Charlie");

    let mut second = Scripted::new([ReviewChoice::Apply(1)]);
    let report = pipeline
        .review(session_id, &mut second, ReviewOptions::default(), &no_progress)
        .await
        .unwrap();
    assert!(!report.paused);
    assert_eq!(second.seen.len(), 1);
    assert_eq!(second.seen[0].0, "Charlie");
    assert_eq!(
        poster_of(&host, 2).as_deref(),
        Some("https://img.test/44/poster1.jpg")
    );

    let session = pipeline.session(session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.stats.applied, 2);
}

#[tokio::test]
async fn single_candidate_applies_without_asking() {
    let (pipeline, host) = pipeline(vec![movie(1, "Alpha", Some("11"))], Arc::new(FakeTmdb::posters(1)));
    let session_id = scan(&pipeline, &[ArtType::Poster]).session_id;

    let mut reviewer = Scripted::new([]);
    let opts = ReviewOptions {
        auto_single: true,
        ..ReviewOptions::default()
    };
    pipeline
        .review(session_id, &mut reviewer, opts, &no_progress)
        .await
        .unwrap();

    assert!(reviewer.seen.is_empty());
    assert!(poster_of(&host, 1).is_some());
    let stats = pipeline.session(session_id).unwrap().stats;
    assert_eq!((stats.applied, stats.auto), (0, 1));
    assert_eq!(stats.details.manual_auto.len(), 1);
}

#[tokio::test]
async fn skip_item_declines_remaining_slots() {
    let (pipeline, host) = pipeline(vec![movie(1, "Alpha", Some("11"))], Arc::new(FakeTmdb::posters(2)));
    let session_id = scan(&pipeline, &[ArtType::Poster, ArtType::Fanart]).session_id;

    let mut reviewer = Scripted::new([ReviewChoice::SkipItem]);
    let report = pipeline
        .review(session_id, &mut reviewer, ReviewOptions::default(), &no_progress)
        .await
        .unwrap();

    assert_eq!(reviewer.seen.len(), 1);
    assert_eq!(report.declined, 2);
    assert_eq!(report.entries_skipped, 1);
    assert_eq!(
        report.items[0].status,
        QueueStatus::Skipped
    );
    assert!(host.get_item(MediaKind::Movie, 1).unwrap().unwrap().art.is_empty());
    let stats = pipeline.session(session_id).unwrap().stats;
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.details.manual_skipped.len(), 2);
}

#[tokio::test]
async fn show_all_then_out_of_range_declines() {
    let (pipeline, _host) = pipeline(vec![movie(1, "Alpha", Some("11"))], Arc::new(FakeTmdb::posters(2)));
    let session_id = scan(&pipeline, &[ArtType::Poster]).session_id;

    let mut reviewer = Scripted::new([ReviewChoice::ShowAll, ReviewChoice::Apply(7)]);
    let report = pipeline
        .review(session_id, &mut reviewer, ReviewOptions::default(), &no_progress)
        .await
        .unwrap();

    assert_eq!(reviewer.seen.len(), 2);
    assert_eq!(report.applied, 0);
    assert_eq!(report.declined, 1);
}
