//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use artkeeper_core::{ArtType, MediaKind, ScanScope};
use artkeeper_lib::ExistingFileMode;

#[derive(Parser)]
#[command(name = "artkeeper")]
#[command(about = "Find and fill missing artwork in a media library", long_about = None)]
pub(crate) struct Cli {
    /// Library file (JSON list of items)
    #[arg(short, long, global = true, default_value = "library.json")]
    pub library: PathBuf,

    /// Database file (defaults to the configured or platform data path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which part of the library a command covers.
#[derive(Args, Clone, Debug)]
pub(crate) struct MediaArgs {
    /// Scope: movies, tvshows, music, musicvideos or all
    #[arg(short, long, default_value = "movies")]
    pub scope: ScanScope,

    /// Media kinds instead of a scope (e.g., movie,set,tvshow)
    #[arg(short, long, value_delimiter = ',')]
    pub kinds: Option<Vec<MediaKind>>,
}

impl MediaArgs {
    pub fn kinds(&self) -> Vec<MediaKind> {
        match &self.kinds {
            Some(kinds) => {
                let mut unique = Vec::with_capacity(kinds.len());
                for kind in kinds {
                    if !unique.contains(kind) {
                        unique.push(*kind);
                    }
                }
                unique
            }
            None => self.scope.kinds().to_vec(),
        }
    }

    /// Label stored on queue entries.
    pub fn label(&self) -> String {
        match &self.kinds {
            Some(kinds) => kinds
                .iter()
                .map(|k| k.short_name())
                .collect::<Vec<_>>()
                .join(","),
            None => self.scope.label().to_string(),
        }
    }
}

/// Provider key overrides, highest priority.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct KeyArgs {
    /// TMDB API key
    #[arg(long)]
    pub tmdb_key: Option<String>,

    /// fanart.tv API key
    #[arg(long)]
    pub fanart_key: Option<String>,

    /// TheAudioDB API key
    #[arg(long)]
    pub audiodb_key: Option<String>,

    /// Preferred artwork language (e.g., en, de)
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scan the library and queue items missing artwork
    Scan {
        #[command(flatten)]
        media: MediaArgs,

        /// Art types to require (e.g., poster,fanart); defaults per kind
        #[arg(short, long, value_delimiter = ',')]
        art_types: Option<Vec<ArtType>>,
    },

    /// Apply the best candidate to every queued slot without asking
    Auto {
        #[command(flatten)]
        media: MediaArgs,

        /// Session to drain (defaults to the open session for the scope)
        #[arg(long)]
        session: Option<i64>,

        /// Ignore cached provider results
        #[arg(long)]
        refresh: bool,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Review queued slots one at a time
    Review {
        #[command(flatten)]
        media: MediaArgs,

        /// Session to drain (defaults to the open session for the scope)
        #[arg(long)]
        session: Option<i64>,

        /// Apply without asking when only one candidate passes the language filter
        #[arg(long)]
        auto_single: bool,

        /// Ignore cached provider results
        #[arg(long)]
        refresh: bool,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Download the library's current artwork to local files
    Download {
        #[command(flatten)]
        media: MediaArgs,

        /// Destination root (defaults to artwork.download_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// What to do with existing files: skip, overwrite, use_existing
        #[arg(long)]
        existing: Option<ExistingFileMode>,

        /// Art types to download (defaults to every set slot)
        #[arg(short, long, value_delimiter = ',')]
        art_types: Option<Vec<ArtType>>,

        /// Parallel downloads (3-8, defaults to artwork.max_workers)
        #[arg(short = 'j', long)]
        workers: Option<usize>,
    },

    /// Fetch provider artwork for every item into the cache
    Warm {
        #[command(flatten)]
        media: MediaArgs,

        /// Parallel fetches (3-8, defaults to artwork.max_workers)
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Ignore cached provider results
        #[arg(long)]
        refresh: bool,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Inspect and maintain the review queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// List, inspect or cancel scan sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage the provider artwork cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or change settings and provider keys
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum QueueAction {
    /// Entry counts by status and media kind
    Stats,

    /// Show the next pending entries
    List {
        #[command(flatten)]
        media: MediaArgs,

        /// Maximum entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Remove every entry for the given media
    Clear {
        #[command(flatten)]
        media: MediaArgs,
    },

    /// Remove finished entries older than N days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[derive(Subcommand)]
pub(crate) enum SessionAction {
    /// List paused sessions (all open sessions with --all)
    List {
        #[arg(long)]
        all: bool,
    },

    /// Show one session's statistics and review log
    Show { id: i64 },

    /// Cancel an open session
    Cancel { id: i64 },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show cache row counts
    Stats,

    /// Remove expired rows and old id mappings
    Prune,

    /// Remove every cached row
    Clear,

    /// Remove cached rows for one item
    Forget {
        kind: MediaKind,
        /// Provider id the item is cached under (e.g., the TMDB id)
        id: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show settings, provider keys and their sources
    Show,

    /// Set a value, e.g. `artwork.language de`
    Set { key: String, value: String },

    /// Remove a value
    Unset { key: String },

    /// Interactively set provider API keys
    Keys,

    /// Print the config file path
    Path,
}
