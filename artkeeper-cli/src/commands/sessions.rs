use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::{DetailEntry, SessionStatus};
use artkeeper_db::ScanSession;
use artkeeper_lib::Store;

use super::{Context, truncate_str};
use crate::CliError;

fn status_label(status: SessionStatus) -> String {
    match status {
        SessionStatus::Running => status.if_supports_color(Stdout, |t| t.cyan()).to_string(),
        SessionStatus::Paused => status.if_supports_color(Stdout, |t| t.yellow()).to_string(),
        SessionStatus::Completed => status.if_supports_color(Stdout, |t| t.green()).to_string(),
        SessionStatus::Cancelled => status.if_supports_color(Stdout, |t| t.dimmed()).to_string(),
    }
}

fn log_session_line(session: &ScanSession, kinds: &str) {
    log::info!(
        "  {:>5}  {:<13} {:<10} {:<24} queued {:>5}, applied {:>5}  last {}",
        session.id.if_supports_color(Stdout, |t| t.bold()),
        session.scan_type.as_str(),
        status_label(session.status),
        truncate_str(kinds, 24),
        session.stats.queued,
        session.stats.applied,
        session.last_activity,
    );
}

fn media_label(store: &Store, id: i64) -> Result<String, CliError> {
    let kinds = store.with(|conn| artkeeper_db::get_session_media_types(conn, id))?;
    Ok(kinds
        .iter()
        .map(|k| k.short_name())
        .collect::<Vec<_>>()
        .join(","))
}

/// Paused sessions, or every open session with `all`.
pub(crate) fn run_sessions_list(ctx: &Context, all: bool) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let sessions = store.with(|conn| {
        if all {
            artkeeper_db::get_open_sessions(conn)
        } else {
            artkeeper_db::get_paused_sessions(conn)
        }
    })?;

    if sessions.is_empty() {
        let msg = if all {
            "No open sessions."
        } else {
            "No paused sessions."
        };
        log::info!("{}", msg.if_supports_color(Stdout, |t| t.dimmed()));
        return Ok(());
    }
    for session in &sessions {
        log_session_line(session, &media_label(&store, session.id)?);
    }
    Ok(())
}

fn log_details(heading: &str, entries: &[DetailEntry]) {
    if entries.is_empty() {
        return;
    }
    log::info!("  {} ({}):", heading.if_supports_color(Stdout, |t| t.bold()), entries.len());
    for entry in entries {
        let art = entry.art_type.map(|a| a.as_str()).unwrap_or("-");
        let extra = entry
            .reason
            .as_deref()
            .or(entry.url.as_deref())
            .unwrap_or_default();
        log::info!(
            "    {:<8} {:<36} {:<10} {}",
            entry.kind.short_name(),
            truncate_str(&entry.title, 36),
            art,
            extra.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
}

/// Counters and review log of one session.
pub(crate) fn run_session_show(ctx: &Context, id: i64) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let session = store
        .with(|conn| artkeeper_db::get_session(conn, id))?
        .ok_or_else(|| CliError::other(format!("Session {id} not found")))?;
    let kinds = media_label(&store, id)?;

    log::info!(
        "Session {} ({}, {})",
        session.id.if_supports_color(Stdout, |t| t.bold()),
        session.scan_type,
        status_label(session.status),
    );
    log::info!("  Media:    {kinds}");
    log::info!("  Started:  {}", session.started_at);
    log::info!("  Activity: {}", session.last_activity);
    if let Some(done) = &session.completed_at {
        log::info!("  Finished: {done}");
    }

    let s = &session.stats;
    crate::log_blank();
    log::info!(
        "  scanned {}  queued {}  applied {}  auto {}  skipped {}  stale {}  errors {}",
        s.scanned,
        s.queued,
        s.applied,
        s.auto,
        s.skipped,
        s.stale,
        s.errors,
    );
    if s.auto_runs > 0 {
        log::info!("  automatic runs: {}", s.auto_runs);
    }
    if let Some(mode) = &s.review_mode {
        log::info!("  review mode: {mode}");
    }

    crate::log_blank();
    log_details("Applied", &s.details.manual_applied);
    log_details("Applied automatically", &s.details.manual_auto);
    log_details("Declined", &s.details.manual_skipped);
    log_details("Already filled", &s.details.stale);
    Ok(())
}

pub(crate) fn run_session_cancel(ctx: &Context, id: i64) -> Result<(), CliError> {
    ctx.open_store()?
        .with(|conn| artkeeper_db::cancel_session(conn, id))?;
    log::info!(
        "{} Session {} cancelled",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        id,
    );
    Ok(())
}
