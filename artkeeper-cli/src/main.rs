//! artkeeper CLI
//!
//! Scan a media library for missing artwork, then fill it automatically or
//! through an interactive review.

mod cli_types;
mod commands;
mod error;
mod logging;
mod spinner;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use cli_types::{CacheAction, Cli, Commands, ConfigAction, QueueAction, SessionAction};
use commands::Context;
use error::CliError;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.quiet, cli.logfile.as_deref()) {
        eprintln!("Failed to set up logging: {e}");
        std::process::exit(2);
    }

    if let Err(e) = run(cli) {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stderr, |t| t.red()),
            e
        );
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::new(cli.library, cli.db, cli.quiet);

    match cli.command {
        Commands::Scan { media, art_types } => commands::scan::run_scan(&ctx, &media, art_types),
        Commands::Auto {
            media,
            session,
            refresh,
            keys,
        } => commands::auto::run_auto(&ctx, &media, session, refresh, &keys),
        Commands::Review {
            media,
            session,
            auto_single,
            refresh,
            keys,
        } => commands::review::run_review(&ctx, &media, session, auto_single, refresh, &keys),
        Commands::Download {
            media,
            dir,
            existing,
            art_types,
            workers,
        } => commands::download::run_download(&ctx, &media, dir, existing, art_types, workers),
        Commands::Warm {
            media,
            workers,
            refresh,
            keys,
        } => commands::warm::run_warm(&ctx, &media, workers, refresh, &keys),
        Commands::Queue { action } => match action {
            QueueAction::Stats => commands::queue::run_queue_stats(&ctx),
            QueueAction::List { media, limit } => commands::queue::run_queue_list(&ctx, &media, limit),
            QueueAction::Clear { media } => commands::queue::run_queue_clear(&ctx, &media),
            QueueAction::Cleanup { days } => commands::queue::run_queue_cleanup(&ctx, days),
        },
        Commands::Sessions { action } => match action {
            SessionAction::List { all } => commands::sessions::run_sessions_list(&ctx, all),
            SessionAction::Show { id } => commands::sessions::run_session_show(&ctx, id),
            SessionAction::Cancel { id } => commands::sessions::run_session_cancel(&ctx, id),
        },
        Commands::Cache { action } => match action {
            CacheAction::Stats => commands::cache::run_cache_stats(&ctx),
            CacheAction::Prune => commands::cache::run_cache_prune(&ctx),
            CacheAction::Clear => commands::cache::run_cache_clear(&ctx),
            CacheAction::Forget { kind, id } => commands::cache::run_cache_forget(&ctx, kind, &id),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(&ctx),
            ConfigAction::Set { key, value } => commands::config::run_config_set(&key, Some(&value)),
            ConfigAction::Unset { key } => commands::config::run_config_set(&key, None),
            ConfigAction::Keys => commands::credentials::run_keys_setup(),
            ConfigAction::Path => commands::config::run_config_path(),
        },
    }
}

/// Print an empty line through the logger.
pub(crate) fn log_blank() {
    log::info!("");
}
