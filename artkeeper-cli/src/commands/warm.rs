use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::LibraryHost;
use artkeeper_lib::worker_queue::{MAX_WORKERS, MIN_WORKERS};
use artkeeper_lib::{resolve_workers, warm_cache};
use artkeeper_scraper::FetchOptions;

use super::{Context, cancel_on_ctrl_c, runtime};
use crate::CliError;
use crate::cli_types::{KeyArgs, MediaArgs};
use crate::spinner;

/// Fetch provider artwork for every item in scope so later reviews are
/// served from the cache.
pub(crate) fn run_warm(
    ctx: &Context,
    media: &MediaArgs,
    workers: Option<usize>,
    refresh: bool,
    keys: &KeyArgs,
) -> Result<(), CliError> {
    let workers = workers
        .map(|n| n.clamp(MIN_WORKERS, MAX_WORKERS))
        .unwrap_or_else(|| resolve_workers(&ctx.settings));

    let library = ctx.open_library()?;
    let mut items = Vec::new();
    for kind in media.kinds() {
        items.extend(library.list_items(kind)?);
    }
    if items.is_empty() {
        log::info!("No items for {}", media.label());
        return Ok(());
    }

    let rt = runtime()?;
    rt.block_on(async {
        let cancel = cancel_on_ctrl_c();
        let pipeline = ctx.pipeline(keys, cancel)?;
        let opts = FetchOptions {
            bypass_cache: refresh,
        };

        let pb = spinner::counter(items.len() as u64, ctx.quiet);
        let summary = warm_cache(pipeline.fetcher(), &items, workers, opts, |key, ok| {
            pb.inc(1);
            if ok {
                pb.set_message(key.to_string());
            }
        })
        .await?;
        pb.finish_and_clear();

        crate::log_blank();
        log::info!(
            "{} Cached artwork for {} items ({} with nothing found)",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            summary.warmed,
            summary.empty,
        );
        if summary.duplicates > 0 {
            log::info!("  {} duplicates ignored", summary.duplicates);
        }
        if summary.failed > 0 {
            log::info!(
                "  {} {} failed",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                summary.failed,
            );
        }
        log::debug!(
            "Queue: {} completed, {} failed, {} dropped",
            summary.queue.completed,
            summary.queue.failed,
            summary.queue.dropped,
        );
        Ok(())
    })
}
