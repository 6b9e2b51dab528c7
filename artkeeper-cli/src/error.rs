use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] artkeeper_db::DbError),

    /// Library file could not be read or written
    #[error("Library error: {0}")]
    Library(#[from] artkeeper_core::HostError),

    /// Provider setup or fetch failed
    #[error("Provider error: {0}")]
    Scrape(#[from] artkeeper_scraper::ScrapeError),

    /// Scan or queue drain failed
    #[error("{0}")]
    Pipeline(#[from] artkeeper_lib::PipelineError),

    /// Download setup failed
    #[error("Download error: {0}")]
    Download(#[from] artkeeper_lib::DownloadError),

    /// Worker queue failed
    #[error("Queue error: {0}")]
    Queue(#[from] artkeeper_lib::QueueError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
