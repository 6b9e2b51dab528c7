//! Artwork downloads to the local filesystem.
//!
//! A [`Downloader`] turns one [`DownloadJob`] into a file next to the
//! caller-supplied base path, choosing the extension from the response's
//! content type. Bodies stream into `<path>.<ext>.part` and are renamed
//! into place; the part file is removed on any failure.
//!
//! Two circuit breakers guard a run: a per-host breaker that stops
//! contacting a host after repeated failures, and a filesystem breaker that
//! stops every download once local writes keep failing.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use artkeeper_core::util::sanitize_path_component;
use artkeeper_core::{ArtType, MediaKind};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{DownloadError, QueueError};
use crate::worker_queue::{WorkResult, WorkStats, WorkerQueue};

/// Consecutive failures before a host or the filesystem is blocked.
pub const BREAKER_THRESHOLD: u32 = 3;

/// Extensions a download can produce, in lookup order.
pub const KNOWN_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp"];

/// What to do when a file for the job already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingFileMode {
    #[default]
    Skip,
    Overwrite,
    UseExisting,
}

impl ExistingFileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::UseExisting => "use_existing",
        }
    }
}

impl std::str::FromStr for ExistingFileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "use_existing" | "reuse" => Ok(Self::UseExisting),
            other => Err(format!("unknown existing-file mode '{other}'")),
        }
    }
}

/// One file to fetch. `dest_base` has no extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub dest_base: PathBuf,
    pub art_type: ArtType,
    pub mode: ExistingFileMode,
}

impl DownloadJob {
    /// Dedupe key: two jobs targeting the same base path are the same job.
    pub fn key(&self) -> String {
        self.dest_base.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    Skipped { existing: PathBuf },
    Reused { path: PathBuf },
}

/// `<root>/<kind>/<title> (<dbid>)/<art_type>`, without extension.
pub fn download_path(root: &Path, kind: MediaKind, title: &str, dbid: i64, art_type: ArtType) -> PathBuf {
    root.join(kind.short_name())
        .join(format!("{} ({dbid})", sanitize_path_component(title)))
        .join(art_type.as_str())
}

/// File extension for a declared content type. Parameters such as
/// `; charset=binary` are ignored.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut os = base.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

fn existing_files(base: &Path) -> Vec<PathBuf> {
    KNOWN_EXTENSIONS
        .iter()
        .map(|ext| with_extension(base, ext))
        .filter(|p| p.is_file())
        .collect()
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

// ── Image source seam ───────────────────────────────────────────────────

/// Streamed response body.
pub trait ImageBody: Send {
    /// Next chunk, or `None` at end of body.
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, DownloadError>>;
}

pub struct ImageResponse {
    pub content_type: Option<String>,
    pub body: Box<dyn ImageBody>,
}

/// Where image bytes come from. The HTTP implementation is
/// [`HttpImageSource`]; tests substitute an in-memory source.
pub trait ImageSource: Send + Sync {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ImageResponse, DownloadError>>;
}

/// reqwest-backed image source.
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new() -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("artkeeper/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }
}

struct HttpBody(reqwest::Response);

impl ImageBody for HttpBody {
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, DownloadError>> {
        async move { Ok(self.0.chunk().await?.map(|b| b.to_vec())) }.boxed()
    }
}

impl ImageSource for HttpImageSource {
    fn open<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ImageResponse, DownloadError>> {
        async move {
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(DownloadError::Status(status.as_u16()));
            }
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(ImageResponse {
                content_type,
                body: Box::new(HttpBody(resp)),
            })
        }
        .boxed()
    }
}

// ── Circuit breakers ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BreakerState {
    host_failures: HashMap<String, u32>,
    fs_failures: u32,
}

/// Consecutive-failure counters for hosts and the local filesystem.
#[derive(Debug)]
pub struct CircuitBreakers {
    threshold: u32,
    state: Mutex<BreakerState>,
}

impl Default for CircuitBreakers {
    fn default() -> Self {
        Self::new(BREAKER_THRESHOLD)
    }
}

impl CircuitBreakers {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            state: Mutex::new(BreakerState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse work for a blocked host or a blocked filesystem.
    pub fn check(&self, host: &str) -> Result<(), DownloadError> {
        let state = self.lock();
        if state.fs_failures >= self.threshold {
            return Err(DownloadError::FilesystemBlocked);
        }
        if state.host_failures.get(host).copied().unwrap_or(0) >= self.threshold {
            return Err(DownloadError::ProviderBlocked(host.to_string()));
        }
        Ok(())
    }

    pub fn record_success(&self, host: &str) {
        let mut state = self.lock();
        state.host_failures.remove(host);
        state.fs_failures = 0;
    }

    pub fn record_host_failure(&self, host: &str) {
        let mut state = self.lock();
        let count = state.host_failures.entry(host.to_string()).or_insert(0);
        *count += 1;
        if *count == self.threshold {
            log::warn!("Blocking downloads from {host} after {count} consecutive failures");
        }
    }

    pub fn record_fs_failure(&self) {
        let mut state = self.lock();
        state.fs_failures += 1;
        if state.fs_failures == self.threshold {
            log::warn!(
                "Blocking all downloads after {} consecutive filesystem failures",
                state.fs_failures
            );
        }
    }

    pub fn is_host_blocked(&self, host: &str) -> bool {
        self.lock().host_failures.get(host).copied().unwrap_or(0) >= self.threshold
    }

    pub fn is_fs_blocked(&self) -> bool {
        self.lock().fs_failures >= self.threshold
    }

    /// Clear every counter, e.g. at the start of a new run.
    pub fn reset(&self) {
        *self.lock() = BreakerState::default();
    }
}

// ── Downloader ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub reused: u64,
    pub failed: u64,
    pub bytes: u64,
    /// Files written per destination folder.
    pub per_folder: BTreeMap<PathBuf, u64>,
}

impl DownloadStats {
    fn record(&mut self, result: &Result<DownloadOutcome, DownloadError>) {
        match result {
            Ok(DownloadOutcome::Downloaded { path, bytes }) => {
                self.downloaded += 1;
                self.bytes += bytes;
                if let Some(parent) = path.parent() {
                    *self.per_folder.entry(parent.to_path_buf()).or_insert(0) += 1;
                }
            }
            Ok(DownloadOutcome::Skipped { .. }) => self.skipped += 1,
            Ok(DownloadOutcome::Reused { .. }) => self.reused += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Where a failure should be charged.
enum Fault {
    Host,
    Filesystem,
    Neither,
}

fn fault_of(err: &DownloadError) -> Fault {
    match err {
        DownloadError::Io(_) => Fault::Filesystem,
        DownloadError::Http(_)
        | DownloadError::Status(_)
        | DownloadError::UnsupportedContentType(_) => Fault::Host,
        DownloadError::ProviderBlocked(_)
        | DownloadError::FilesystemBlocked
        | DownloadError::Cancelled => Fault::Neither,
    }
}

/// Runs download jobs against an [`ImageSource`], sharing breakers and
/// statistics across clones.
#[derive(Clone)]
pub struct Downloader {
    source: Arc<dyn ImageSource>,
    breakers: Arc<CircuitBreakers>,
    stats: Arc<Mutex<DownloadStats>>,
    cancel: Arc<AtomicBool>,
}

impl Downloader {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self {
            source,
            breakers: Arc::new(CircuitBreakers::default()),
            stats: Arc::new(Mutex::new(DownloadStats::default())),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn http() -> Result<Self, DownloadError> {
        Ok(Self::new(Arc::new(HttpImageSource::new()?)))
    }

    pub fn with_breakers(mut self, breakers: Arc<CircuitBreakers>) -> Self {
        self.breakers = breakers;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        &self.breakers
    }

    pub fn stats(&self) -> DownloadStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Run one job, updating breakers and statistics.
    pub async fn download(&self, job: &DownloadJob) -> Result<DownloadOutcome, DownloadError> {
        let host = host_of(&job.url);
        let result = self.run(job, &host).await;
        match &result {
            Ok(DownloadOutcome::Downloaded { path, bytes }) => {
                self.breakers.record_success(&host);
                log::debug!("Downloaded {} ({bytes} bytes)", path.display());
            }
            Ok(_) => {}
            Err(e) => {
                match fault_of(e) {
                    Fault::Host => self.breakers.record_host_failure(&host),
                    Fault::Filesystem => self.breakers.record_fs_failure(),
                    Fault::Neither => {}
                }
                log::warn!("Download of {} failed: {e}", job.url);
            }
        }
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&result);
        result
    }

    async fn run(&self, job: &DownloadJob, host: &str) -> Result<DownloadOutcome, DownloadError> {
        if self.cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let existing = existing_files(&job.dest_base);
        match (job.mode, existing.first()) {
            (ExistingFileMode::Skip, Some(path)) => {
                return Ok(DownloadOutcome::Skipped {
                    existing: path.clone(),
                });
            }
            (ExistingFileMode::UseExisting, Some(path)) => {
                return Ok(DownloadOutcome::Reused { path: path.clone() });
            }
            _ => {}
        }
        self.breakers.check(host)?;

        if let Some(parent) = job.dest_base.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = self.source.open(&job.url).await?;
        let content_type = response.content_type.clone().unwrap_or_default();
        let ext = extension_for(&content_type)
            .ok_or_else(|| DownloadError::UnsupportedContentType(content_type.clone()))?;
        let target = with_extension(&job.dest_base, ext);
        let part = with_extension(&job.dest_base, &format!("{ext}.part"));

        let bytes = match self.stream_to(&part, response.body.as_mut()).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part).await {
                    log::debug!("Could not remove {}: {rm}", part.display());
                }
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&part, &target).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }

        if job.mode == ExistingFileMode::Overwrite {
            for other in existing.iter().filter(|p| **p != target) {
                if let Err(e) = tokio::fs::remove_file(other).await {
                    log::warn!("Could not remove replaced file {}: {e}", other.display());
                }
            }
        }

        Ok(DownloadOutcome::Downloaded {
            path: target,
            bytes,
        })
    }

    async fn stream_to(&self, part: &Path, body: &mut dyn ImageBody) -> Result<u64, DownloadError> {
        let mut file = tokio::fs::File::create(part).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next_chunk().await? {
            if self.cancelled() {
                return Err(DownloadError::Cancelled);
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

// ── Download queue ──────────────────────────────────────────────────────

/// Parallel download runner over the worker queue, deduplicated by target path.
pub struct DownloadQueue {
    downloader: Downloader,
    queue: WorkerQueue<DownloadJob, DownloadOutcome>,
}

impl DownloadQueue {
    pub fn new(downloader: Downloader, workers: usize) -> Self {
        let worker_downloader = downloader.clone();
        let queue = WorkerQueue::new(workers, move |job: DownloadJob, _cancel| {
            let downloader = worker_downloader.clone();
            async move { downloader.download(&job).await }
        })
        .with_cancel(Arc::clone(&downloader.cancel));
        Self { downloader, queue }
    }

    pub fn start(&mut self) -> Result<(), QueueError> {
        self.queue.start()
    }

    /// Returns `false` when a job for the same path is already queued or
    /// running.
    pub fn submit(&self, job: DownloadJob) -> bool {
        self.queue.submit(job.key(), job)
    }

    pub fn stop(&self, graceful: bool) {
        self.queue.stop(graceful);
    }

    pub fn queue_stats(&self) -> WorkStats {
        self.queue.stats()
    }

    pub fn download_stats(&self) -> DownloadStats {
        self.downloader.stats()
    }

    pub async fn recv(&mut self) -> Option<WorkResult<DownloadOutcome>> {
        self.queue.recv().await
    }

    /// Finish queued work and return every result with the final statistics.
    pub async fn finish(self) -> (Vec<WorkResult<DownloadOutcome>>, DownloadStats) {
        let downloader = self.downloader;
        let (results, _) = self.queue.drain().await;
        (results, downloader.stats())
    }
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
