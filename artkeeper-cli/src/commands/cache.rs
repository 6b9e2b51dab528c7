use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::MediaKind;

use super::Context;
use crate::CliError;

/// Show cache row counts.
pub(crate) fn run_cache_stats(ctx: &Context) -> Result<(), CliError> {
    let stats = ctx.open_store()?.with(artkeeper_db::cache_stats)?;
    if stats.rows == 0 {
        log::info!(
            "{}",
            "The artwork cache is empty.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        log::info!("Run 'artkeeper warm' to fill it.");
        return Ok(());
    }
    log::info!("{}", "Artwork cache:".if_supports_color(Stdout, |t| t.bold()));
    log::info!("  Rows:             {}", stats.rows);
    log::info!("  Expired:          {}", stats.expired);
    log::info!("  Complete items:   {}", stats.complete_items);
    Ok(())
}

/// Remove expired rows and id mappings past their retention.
pub(crate) fn run_cache_prune(ctx: &Context) -> Result<(), CliError> {
    let (rows, mappings) = ctx.open_store()?.with(|conn| {
        Ok((
            artkeeper_db::clear_expired_cache(conn)?,
            artkeeper_db::prune_id_mappings(conn)?,
        ))
    })?;
    log::info!(
        "{} Removed {} expired rows and {} old id mappings",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        rows,
        mappings,
    );
    Ok(())
}

pub(crate) fn run_cache_clear(ctx: &Context) -> Result<(), CliError> {
    let removed = ctx.open_store()?.with(artkeeper_db::clear_cache)?;
    log::info!(
        "{} Cache cleared ({} rows)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        removed,
    );
    Ok(())
}

/// Drop every cached row for one item so the next fetch goes to the providers.
pub(crate) fn run_cache_forget(ctx: &Context, kind: MediaKind, id: &str) -> Result<(), CliError> {
    let removed = ctx
        .open_store()?
        .with(|conn| artkeeper_db::clear_cache_for_item(conn, kind, &[id]))?;
    if removed == 0 {
        log::warn!(
            "{} Nothing cached for {} {}",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            kind,
            id,
        );
    } else {
        log::info!(
            "{} Removed {} rows for {} {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            removed,
            kind,
            id,
        );
    }
    Ok(())
}
