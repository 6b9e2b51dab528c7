//! Artwork pipeline: scan a library for missing artwork, queue it, and
//! drain the queue automatically or with a reviewer.

pub mod auto_apply;
pub mod cache_warm;
pub mod download;
pub mod error;
pub mod host;
pub mod library_cache;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod review;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod worker_queue;

#[cfg(test)]
mod test_support;

pub use cache_warm::{WarmSummary, warm_cache, warm_key};
pub use download::{
    CircuitBreakers, DownloadJob, DownloadOutcome, DownloadQueue, DownloadStats, Downloader,
    ExistingFileMode, HttpImageSource, ImageSource, download_path,
};
pub use error::{DownloadError, PipelineError, QueueError};
pub use host::JsonLibrary;
pub use library_cache::LibraryCache;
pub use pipeline::Pipeline;
pub use progress::PipelineProgress;
pub use report::{ItemOutcome, RunReport, SkipReason};
pub use review::{ReviewChoice, ReviewOptions, ReviewPrompt, Reviewer};
pub use scanner::{ScanOptions, ScanSummary};
pub use settings::{Settings, load_settings, resolve_database_path, resolve_workers};
pub use store::Store;
pub use worker_queue::{WorkResult, WorkStats, WorkerDetail, WorkerQueue, auto_worker_count};
