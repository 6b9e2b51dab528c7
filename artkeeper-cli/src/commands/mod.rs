pub(crate) mod auto;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod credentials;
pub(crate) mod download;
pub(crate) mod queue;
pub(crate) mod review;
pub(crate) mod scan;
pub(crate) mod sessions;
pub(crate) mod warm;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::{LibraryHost, MediaKind};
use artkeeper_lib::{
    JsonLibrary, Pipeline, PipelineProgress, RunReport, ScanOptions, Settings, SkipReason, Store,
    load_settings, resolve_database_path,
};
use artkeeper_scraper::ApiKeys;

use crate::CliError;
use crate::cli_types::{KeyArgs, MediaArgs};
use crate::spinner::PipelineDisplay;

/// Global options and settings every command starts from.
pub(crate) struct Context {
    pub library: PathBuf,
    pub db: Option<PathBuf>,
    pub quiet: bool,
    pub settings: Settings,
}

impl Context {
    pub fn new(library: PathBuf, db: Option<PathBuf>, quiet: bool) -> Self {
        Self {
            library,
            db,
            quiet,
            settings: load_settings(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        resolve_database_path(self.db.clone(), &self.settings)
    }

    pub fn open_store(&self) -> Result<Store, CliError> {
        let path = self.database_path();
        log::debug!("Database: {}", path.display());
        Ok(Store::open(&path)?)
    }

    pub fn open_library(&self) -> Result<Arc<JsonLibrary>, CliError> {
        if !self.library.exists() {
            return Err(CliError::config(format!(
                "Library file {} not found (use --library)",
                self.library.display()
            )));
        }
        Ok(Arc::new(JsonLibrary::open(&self.library)?))
    }

    /// Preferred language: command line, then settings.
    pub fn language(&self, keys: &KeyArgs) -> Option<String> {
        keys.language
            .clone()
            .or_else(|| self.settings.artwork.language.clone())
    }

    /// Wire the store, the library and the configured providers.
    pub fn pipeline(&self, keys: &KeyArgs, cancel: Arc<AtomicBool>) -> Result<Pipeline, CliError> {
        let api_keys = ApiKeys::load().with_overrides(
            keys.tmdb_key.clone(),
            keys.fanart_key.clone(),
            keys.audiodb_key.clone(),
        );
        if !api_keys.has_any() {
            log::warn!(
                "{} No TMDB or fanart.tv key configured; run 'artkeeper config keys'",
                "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            );
        }
        let host: Arc<dyn LibraryHost> = self.open_library()?;
        let pipeline = Pipeline::from_keys(
            self.open_store()?,
            host,
            &api_keys,
            self.language(keys).as_deref(),
            cancel,
        )?;
        Ok(pipeline)
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))
}

/// A flag raised by the first Ctrl-C. Must be called inside a runtime.
pub(crate) fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let raised = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; finishing the current item...");
            raised.store(true, Ordering::SeqCst);
        }
    });
    flag
}

/// Session to drain: the explicit one, the newest open session for these
/// kinds, or a fresh scan. `None` when there is nothing to do.
pub(crate) fn pick_session(
    pipeline: &Pipeline,
    media: &MediaArgs,
    explicit: Option<i64>,
    display: &PipelineDisplay,
) -> Result<Option<i64>, CliError> {
    if let Some(id) = explicit {
        return Ok(Some(id));
    }
    let kinds = media.kinds();
    if let Some(session) = pipeline.open_sessions_for(&kinds)?.first() {
        log::info!(
            "Continuing session {} ({})",
            session.id.if_supports_color(Stdout, |t| t.bold()),
            session.status,
        );
        return Ok(Some(session.id));
    }

    log::info!("No open session for {}; scanning first", media.label());
    let opts = ScanOptions {
        scope_label: Some(media.label()),
        ..ScanOptions::default()
    };
    let summary = pipeline.scan(&kinds, &opts, &|p| display.handle(p))?;
    if summary.cancelled {
        return Ok(None);
    }
    if summary.queued == 0 {
        log::info!(
            "{} Nothing is missing artwork",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        );
        return Ok(None);
    }
    log::info!("Queued {} items", summary.queued);
    Ok(Some(summary.session_id))
}

/// Progress callback that forwards to a display.
pub(crate) fn progress_fn(display: &PipelineDisplay) -> impl Fn(PipelineProgress) + '_ {
    move |p| display.handle(p)
}

pub(crate) fn kinds_label(kinds: &[MediaKind]) -> String {
    kinds
        .iter()
        .map(|k| k.short_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// End-of-run summary by outcome category.
pub(crate) fn print_report(report: &RunReport) {
    crate::log_blank();
    let status = if report.paused {
        "paused".if_supports_color(Stdout, |t| t.yellow()).to_string()
    } else {
        "finished".if_supports_color(Stdout, |t| t.green()).to_string()
    };
    log::info!(
        "Session {} {}: {} items",
        report.session_id.if_supports_color(Stdout, |t| t.bold()),
        status,
        report.entries(),
    );
    log::info!(
        "  {} applied: {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        report.applied,
    );
    for (reason, count) in report.skip_breakdown() {
        let glyph = match reason {
            SkipReason::Stale => "\u{21BB}",
            _ => "\u{2013}",
        };
        log::info!(
            "  {} {}: {}",
            glyph.if_supports_color(Stdout, |t| t.dimmed()),
            reason,
            count,
        );
    }
    if report.errors > 0 {
        log::info!(
            "  {} errors: {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            report.errors,
        );
        for item in report.items.iter().filter(|i| i.error.is_some()) {
            log::info!(
                "      {} {}: {}",
                item.kind,
                item.title,
                item.reason().unwrap_or_default(),
            );
        }
    }
    if report.paused {
        log::info!(
            "{}",
            "Run the same command again to continue.".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
}

/// Truncate a string to a maximum width, appending "..." if needed.
pub(crate) fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max > 3 {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_str("Amélie", 10), "Amélie");
        assert_eq!(truncate_str("The Lord of the Rings", 10), "The Lor...");
        assert_eq!(truncate_str("abcdef", 2), "ab");
    }

    #[test]
    fn kinds_are_joined() {
        assert_eq!(kinds_label(&[MediaKind::Movie, MediaKind::Set]), "movie, set");
    }
}
