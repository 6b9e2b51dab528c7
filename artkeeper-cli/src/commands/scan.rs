use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::{ArtType, LibraryHost};
use artkeeper_lib::{LibraryCache, Pipeline, ScanOptions};
use artkeeper_scraper::MultiSourceFetcher;

use super::{Context, cancel_on_ctrl_c, kinds_label, runtime};
use crate::CliError;
use crate::cli_types::MediaArgs;
use crate::spinner::PipelineDisplay;

/// Queue every item in scope that is missing artwork.
pub(crate) fn run_scan(
    ctx: &Context,
    media: &MediaArgs,
    art_types: Option<Vec<ArtType>>,
) -> Result<(), CliError> {
    let kinds = media.kinds();
    let store = ctx.open_store()?;
    let library = Arc::new(LibraryCache::new(ctx.open_library()?));
    let fetch_host: Arc<dyn LibraryHost> = library.clone();
    // Scanning reads only the library; no provider is needed.
    let fetcher = MultiSourceFetcher::new(fetch_host, store.cache());

    let rt = runtime()?;
    let _guard = rt.enter();
    let cancel = cancel_on_ctrl_c();
    let pipeline = Pipeline::new(store, library, fetcher).with_cancel(cancel);

    log::info!(
        "Scanning {} in {}",
        kinds_label(&kinds).if_supports_color(Stdout, |t| t.bold()),
        ctx.library.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    let opts = ScanOptions {
        art_types,
        scope_label: Some(media.label()),
        ..ScanOptions::default()
    };
    let display = PipelineDisplay::new(ctx.quiet);
    let summary = pipeline.scan(&kinds, &opts, &|p| display.handle(p))?;
    display.finish();
    pipeline.shutdown();

    crate::log_blank();
    log::info!(
        "{} Session {}{}",
        if summary.cancelled {
            "\u{23F8}".if_supports_color(Stdout, |t| t.yellow()).to_string()
        } else {
            "\u{2714}".if_supports_color(Stdout, |t| t.green()).to_string()
        },
        summary.session_id.if_supports_color(Stdout, |t| t.bold()),
        if summary.resumed { " (resumed)" } else { "" },
    );
    log::info!("  Scanned: {}", summary.scanned);
    log::info!(
        "  Queued:  {} items, {} art slots",
        summary.queued,
        summary.art_items
    );
    for (kind, count) in &summary.per_kind {
        log::info!("    {}: {}", kind.display_name(), count);
    }
    if summary.cancelled {
        log::info!(
            "{}",
            "Scan interrupted; run it again to continue.".if_supports_color(Stdout, |t| t.dimmed()),
        );
    } else if summary.queued > 0 {
        log::info!(
            "{}",
            "Next: 'artkeeper auto' or 'artkeeper review'".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}
