use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_db::QueueStats;

use super::{Context, kinds_label, truncate_str};
use crate::CliError;
use crate::cli_types::MediaArgs;

fn log_stats(label: &str, stats: &QueueStats) {
    log::info!(
        "  {:<12} {:>6} pending  {:>6} done  {:>6} skipped  {:>6} error",
        label,
        stats.pending,
        stats.completed,
        stats.skipped,
        stats.error,
    );
}

/// Queue counts, overall and per media kind.
pub(crate) fn run_queue_stats(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let (total, breakdown) = store.with(|conn| {
        Ok((
            artkeeper_db::get_queue_stats(conn, &[])?,
            artkeeper_db::get_queue_breakdown(conn)?,
        ))
    })?;

    if total.total() == 0 {
        log::info!(
            "{}",
            "The queue is empty.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }

    log::info!("{}", "Queue:".if_supports_color(Stdout, |t| t.bold()));
    for (kind, stats) in &breakdown {
        log_stats(kind.short_name(), stats);
    }
    if breakdown.len() > 1 {
        log_stats("total", &total);
    }
    Ok(())
}

/// The next pending entries in processing order.
pub(crate) fn run_queue_list(ctx: &Context, media: &MediaArgs, limit: usize) -> Result<(), CliError> {
    let kinds = media.kinds();
    let store = ctx.open_store()?;
    let batch = store.with(|conn| {
        let entries = artkeeper_db::get_next_batch(conn, limit, &kinds)?;
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        let arts = artkeeper_db::get_art_items_for_queue_batch(conn, &ids)?;
        Ok((entries, arts))
    })?;
    let (entries, arts) = batch;

    if entries.is_empty() {
        log::info!("No pending entries for {}", kinds_label(&kinds));
        return Ok(());
    }
    for entry in &entries {
        let types: Vec<&str> = arts
            .get(&entry.id)
            .map(|items| {
                items
                    .iter()
                    .filter(|a| a.status == artkeeper_core::ArtItemStatus::Pending)
                    .map(|a| a.art_type.as_str())
                    .collect()
            })
            .unwrap_or_default();
        let year = entry.year.map(|y| format!(" ({y})")).unwrap_or_default();
        log::info!(
            "  {:>6}  {:<8} {:<40} {}",
            entry.id.if_supports_color(Stdout, |t| t.dimmed()),
            entry.kind.short_name(),
            truncate_str(&format!("{}{year}", entry.title), 40),
            types.join(", ").if_supports_color(Stdout, |t| t.cyan()),
        );
    }
    Ok(())
}

pub(crate) fn run_queue_clear(ctx: &Context, media: &MediaArgs) -> Result<(), CliError> {
    let kinds = media.kinds();
    let removed = ctx
        .open_store()?
        .with(|conn| artkeeper_db::clear_queue_for_media(conn, &kinds))?;
    log::info!(
        "{} Removed {} entries for {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        removed,
        kinds_label(&kinds),
    );
    Ok(())
}

pub(crate) fn run_queue_cleanup(ctx: &Context, days: i64) -> Result<(), CliError> {
    if days < 0 {
        return Err(CliError::other("--days must not be negative"));
    }
    let removed = ctx
        .open_store()?
        .with(|conn| artkeeper_db::cleanup_old_queue_items(conn, days))?;
    log::info!(
        "{} Removed {} finished entries older than {} days",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        removed,
        days,
    );
    Ok(())
}
