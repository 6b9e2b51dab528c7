use artkeeper_core::HostError;
use artkeeper_db::DbError;
use artkeeper_scraper::ScrapeError;
use thiserror::Error;

/// Errors from the worker queue itself (not from the items it runs).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Worker queue is already running")]
    AlreadyStarted,

    #[error("Worker queue has been stopped")]
    Stopped,

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors that abort a scan, auto-apply or review run.
///
/// Per-item problems never surface here; they become outcome records.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Db(#[from] DbError),

    #[error("Fetch error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Library error: {0}")]
    Host(#[from] HostError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session {0} not found")]
    SessionNotFound(i64),

    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Why a single download did not produce a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Downloads from {0} are blocked after repeated failures")]
    ProviderBlocked(String),

    #[error("Downloads are blocked after repeated filesystem failures")]
    FilesystemBlocked,

    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Whether the failure came from the local filesystem rather than the host.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
