use artkeeper_scraper::FetchOptions;

use super::{Context, cancel_on_ctrl_c, pick_session, print_report, progress_fn, runtime};
use crate::CliError;
use crate::cli_types::{KeyArgs, MediaArgs};
use crate::spinner::PipelineDisplay;

/// Apply the top-ranked candidate to every queued slot.
pub(crate) fn run_auto(
    ctx: &Context,
    media: &MediaArgs,
    session: Option<i64>,
    refresh: bool,
    keys: &KeyArgs,
) -> Result<(), CliError> {
    let rt = runtime()?;
    rt.block_on(async {
        let cancel = cancel_on_ctrl_c();
        let pipeline = ctx.pipeline(keys, cancel)?;
        let display = PipelineDisplay::new(ctx.quiet);

        let Some(session_id) = pick_session(&pipeline, media, session, &display)? else {
            display.finish();
            return Ok(());
        };
        let opts = FetchOptions {
            bypass_cache: refresh,
        };
        let progress = progress_fn(&display);
        let report = pipeline.auto_apply(session_id, opts, &progress).await;
        display.finish();
        pipeline.shutdown();

        print_report(&report?);
        Ok(())
    })
}
