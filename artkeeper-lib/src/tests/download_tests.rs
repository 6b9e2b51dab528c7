use super::*;

use std::sync::atomic::AtomicUsize;

/// In-memory body. With `drop_after` set, the connection fails once that
/// many chunks have been served.
struct MemoryBody {
    chunks: Vec<Vec<u8>>,
    drop_after: Option<usize>,
    served: usize,
}

impl MemoryBody {
    fn whole(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            drop_after: None,
            served: 0,
        }
    }

    fn truncated(chunks: Vec<Vec<u8>>, after: usize) -> Self {
        Self {
            chunks,
            drop_after: Some(after),
            served: 0,
        }
    }
}

impl ImageBody for MemoryBody {
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, DownloadError>> {
        let next = if self.drop_after == Some(self.served) {
            Err(DownloadError::Status(502))
        } else if self.chunks.is_empty() {
            Ok(None)
        } else {
            self.served += 1;
            Ok(Some(self.chunks.remove(0)))
        };
        async move { next }.boxed()
    }
}

/// Serves fixed bodies; URLs containing "broken" answer HTTP 503 and
/// URLs containing "truncated" drop the connection after one chunk.
#[derive(Default)]
struct MemorySource {
    content_type: String,
    opens: AtomicUsize,
}

impl MemorySource {
    fn new(content_type: &str) -> Arc<Self> {
        Arc::new(Self {
            content_type: content_type.to_string(),
            opens: AtomicUsize::new(0),
        })
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ImageSource for MemorySource {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ImageResponse, DownloadError>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let content_type = self.content_type.clone();
        async move {
            if url.contains("broken") {
                return Err(DownloadError::Status(503));
            }
            let chunks = vec![b"\xff\xd8abc".to_vec(), b"def".to_vec()];
            let body = if url.contains("truncated") {
                MemoryBody::truncated(chunks, 1)
            } else {
                MemoryBody::whole(chunks)
            };
            Ok(ImageResponse {
                content_type: Some(content_type),
                body: Box::new(body),
            })
        }
        .boxed()
    }
}

fn job(dir: &Path, name: &str, url: &str, mode: ExistingFileMode) -> DownloadJob {
    DownloadJob {
        url: url.to_string(),
        dest_base: dir.join("movie").join(name).join("poster"),
        art_type: ArtType::Poster,
        mode,
    }
}

#[test]
fn extension_ignores_parameters() {
    assert_eq!(extension_for("image/jpeg"), Some("jpg"));
    assert_eq!(extension_for("Image/PNG; charset=binary"), Some("png"));
    assert_eq!(extension_for("image/webp"), Some("webp"));
    assert_eq!(extension_for("text/html; charset=utf-8"), None);
    assert_eq!(extension_for(""), None);
}

#[test]
fn download_path_layout() {
    let path = download_path(
        Path::new("/art"),
        MediaKind::Movie,
        "Alien: Resurrection",
        42,
        ArtType::ClearLogo,
    );
    assert_eq!(
        path,
        PathBuf::from("/art/movie/Alien_ Resurrection (42)/clearlogo")
    );
}

#[test]
fn existing_mode_parses() {
    assert_eq!("use-existing".parse::<ExistingFileMode>(), Ok(ExistingFileMode::UseExisting));
    assert_eq!("Overwrite".parse::<ExistingFileMode>(), Ok(ExistingFileMode::Overwrite));
    assert!("keep".parse::<ExistingFileMode>().is_err());
}

#[tokio::test]
async fn writes_file_with_content_type_extension() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone());

    let j = job(tmp.path(), "Heat (1)", "https://img.example/p.jpg", ExistingFileMode::Skip);
    let outcome = downloader.download(&j).await.unwrap();

    let expected = tmp.path().join("movie/Heat (1)/poster.jpg");
    assert_eq!(
        outcome,
        DownloadOutcome::Downloaded {
            path: expected.clone(),
            bytes: 8
        }
    );
    assert_eq!(std::fs::read(&expected).unwrap(), b"\xff\xd8abcdef");
    assert!(!tmp.path().join("movie/Heat (1)/poster.jpg.part").exists());

    let stats = downloader.stats();
    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.bytes, 8);
    assert_eq!(stats.per_folder.get(&tmp.path().join("movie/Heat (1)")), Some(&1));
}

#[tokio::test]
async fn skip_and_use_existing_make_no_request() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("movie/Heat (1)");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("poster.png"), b"old").unwrap();
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone());

    let skipped = downloader
        .download(&job(tmp.path(), "Heat (1)", "https://img.example/p.jpg", ExistingFileMode::Skip))
        .await
        .unwrap();
    assert_eq!(
        skipped,
        DownloadOutcome::Skipped {
            existing: dir.join("poster.png")
        }
    );

    let reused = downloader
        .download(&job(
            tmp.path(),
            "Heat (1)",
            "https://img.example/p.jpg",
            ExistingFileMode::UseExisting,
        ))
        .await
        .unwrap();
    assert_eq!(reused, DownloadOutcome::Reused { path: dir.join("poster.png") });

    assert_eq!(source.opens(), 0);
    let stats = downloader.stats();
    assert_eq!((stats.skipped, stats.reused, stats.downloaded), (1, 1, 0));
}

#[tokio::test]
async fn overwrite_replaces_other_extensions() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("movie/Heat (1)");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("poster.png"), b"old").unwrap();
    let downloader = Downloader::new(MemorySource::new("image/jpeg"));

    downloader
        .download(&job(
            tmp.path(),
            "Heat (1)",
            "https://img.example/p.jpg",
            ExistingFileMode::Overwrite,
        ))
        .await
        .unwrap();

    assert!(dir.join("poster.jpg").exists());
    assert!(!dir.join("poster.png").exists());
}

#[tokio::test]
async fn unsupported_content_type_leaves_nothing_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(MemorySource::new("text/html"));

    let err = downloader
        .download(&job(tmp.path(), "Heat (1)", "https://img.example/p", ExistingFileMode::Skip))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::UnsupportedContentType(ref ct) if ct == "text/html"));

    let dir = tmp.path().join("movie/Heat (1)");
    let leftovers: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert!(leftovers.is_empty());
    assert_eq!(downloader.stats().failed, 1);
}

#[tokio::test]
async fn host_breaker_blocks_without_network() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone());

    for n in 0..BREAKER_THRESHOLD {
        let err = downloader
            .download(&job(
                tmp.path(),
                &format!("Item ({n})"),
                "https://broken.example/a.jpg",
                ExistingFileMode::Skip,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Status(503)));
    }
    assert_eq!(source.opens(), BREAKER_THRESHOLD as usize);
    assert!(downloader.breakers().is_host_blocked("broken.example"));

    let err = downloader
        .download(&job(tmp.path(), "Late (9)", "https://broken.example/b.jpg", ExistingFileMode::Skip))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::ProviderBlocked(ref h) if h == "broken.example"));
    assert_eq!(source.opens(), BREAKER_THRESHOLD as usize);

    // Other hosts are unaffected.
    downloader
        .download(&job(tmp.path(), "Fine (10)", "https://img.example/c.jpg", ExistingFileMode::Skip))
        .await
        .unwrap();

    downloader.breakers().reset();
    assert!(!downloader.breakers().is_host_blocked("broken.example"));
}

#[test]
fn success_resets_host_and_filesystem_counts() {
    let breakers = CircuitBreakers::new(2);
    breakers.record_host_failure("a");
    breakers.record_fs_failure();
    breakers.record_success("a");
    breakers.record_host_failure("a");
    breakers.record_fs_failure();
    assert!(breakers.check("a").is_ok());

    breakers.record_fs_failure();
    assert!(matches!(breakers.check("b"), Err(DownloadError::FilesystemBlocked)));
}

#[tokio::test]
async fn filesystem_breaker_trips_on_unwritable_root() {
    let tmp = tempfile::tempdir().unwrap();
    // A regular file where a directory is needed makes create_dir_all fail.
    let blocker = tmp.path().join("movie");
    std::fs::write(&blocker, b"not a dir").unwrap();
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone());

    for n in 0..BREAKER_THRESHOLD {
        let err = downloader
            .download(&job(tmp.path(), &format!("X ({n})"), "https://img.example/a.jpg", ExistingFileMode::Skip))
            .await
            .unwrap_err();
        assert!(err.is_filesystem());
    }
    let err = downloader
        .download(&job(tmp.path(), "Y (1)", "https://other.example/a.jpg", ExistingFileMode::Skip))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::FilesystemBlocked));
    assert_eq!(source.opens(), 0);
}

#[tokio::test]
async fn cancelled_download_does_not_start() {
    let tmp = tempfile::tempdir().unwrap();
    let cancel = Arc::new(AtomicBool::new(true));
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone()).with_cancel(cancel);

    let err = downloader
        .download(&job(tmp.path(), "Heat (1)", "https://img.example/p.jpg", ExistingFileMode::Skip))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Cancelled));
    assert_eq!(source.opens(), 0);
}

#[tokio::test]
async fn queue_dedupes_by_target_path() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new("image/png");
    let mut queue = DownloadQueue::new(Downloader::new(source.clone()), 2);

    let a = job(tmp.path(), "A (1)", "https://img.example/a.png", ExistingFileMode::Skip);
    let same_target = job(tmp.path(), "A (1)", "https://img.example/other.png", ExistingFileMode::Skip);
    let b = job(tmp.path(), "B (2)", "https://img.example/b.png", ExistingFileMode::Skip);
    assert!(queue.submit(a));
    assert!(!queue.submit(same_target));
    assert!(queue.submit(b));

    queue.start().unwrap();
    let (results, stats) = queue.finish().await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.succeeded()));
    assert_eq!(stats.downloaded, 2);
    assert_eq!(source.opens(), 2);
    assert!(tmp.path().join("movie/A (1)/poster.png").exists());
}

#[tokio::test]
async fn interrupted_body_leaves_no_files_and_counts_against_host() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone());

    let folder = tmp.path().join("movie/Heat (1)");
    let err = downloader
        .download(&job(tmp.path(), "Heat (1)", "https://cut.example/truncated.jpg", ExistingFileMode::Skip))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Status(502)));
    assert!(!folder.join("poster.jpg.part").exists());
    assert!(!folder.join("poster.jpg").exists());
    assert_eq!(downloader.stats().downloaded, 0);

    for n in 1..BREAKER_THRESHOLD {
        downloader
            .download(&job(
                tmp.path(),
                &format!("Heat ({})", n + 1),
                "https://cut.example/truncated.jpg",
                ExistingFileMode::Skip,
            ))
            .await
            .unwrap_err();
    }
    assert!(downloader.breakers().is_host_blocked("cut.example"));
    assert!(!downloader.breakers().is_fs_blocked());
}

#[tokio::test]
async fn blocked_host_still_reports_existing_files() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new("image/jpeg");
    let downloader = Downloader::new(source.clone());
    for _ in 0..BREAKER_THRESHOLD {
        downloader.breakers().record_host_failure("img.example");
    }

    let existing = tmp.path().join("movie/Heat (1)/poster.png");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"png").unwrap();

    let skip = job(tmp.path(), "Heat (1)", "https://img.example/p.jpg", ExistingFileMode::Skip);
    assert_eq!(
        downloader.download(&skip).await.unwrap(),
        DownloadOutcome::Skipped {
            existing: existing.clone()
        }
    );
    let reuse = job(tmp.path(), "Heat (1)", "https://img.example/p.jpg", ExistingFileMode::UseExisting);
    assert_eq!(
        downloader.download(&reuse).await.unwrap(),
        DownloadOutcome::Reused { path: existing }
    );

    let fresh = job(tmp.path(), "Other (2)", "https://img.example/q.jpg", ExistingFileMode::Skip);
    assert!(matches!(
        downloader.download(&fresh).await.unwrap_err(),
        DownloadError::ProviderBlocked(_)
    ));
    assert_eq!(source.opens(), 0);
}
