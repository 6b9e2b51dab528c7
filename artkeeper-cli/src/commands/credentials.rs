use std::io::{BufRead, Write};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_scraper::ApiKeys;

use super::config::mask_value;
use crate::CliError;

/// Prompt for one key. Enter keeps `current`; `-` clears it.
fn prompt_key(
    input: &mut impl BufRead,
    label: &str,
    current: Option<&str>,
) -> Result<Option<String>, CliError> {
    match current {
        Some(v) => print!("  {} [{}]: ", label, mask_value(v)),
        None => print!("  {}: ", label),
    }
    std::io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(match line.trim() {
        "" => current.map(str::to_string),
        "-" => None,
        value => Some(value.to_string()),
    })
}

fn prompt_all(input: &mut impl BufRead, existing: &ApiKeys) -> Result<ApiKeys, CliError> {
    Ok(ApiKeys {
        tmdb: prompt_key(input, "TMDB API key", existing.tmdb.as_deref())?,
        fanart: prompt_key(input, "fanart.tv API key", existing.fanart.as_deref())?,
        audiodb: prompt_key(
            input,
            "TheAudioDB API key (optional)",
            existing.audiodb.as_deref(),
        )?,
    })
}

/// Interactively set provider API keys.
pub(crate) fn run_keys_setup() -> Result<(), CliError> {
    println!(
        "{}",
        "Provider API keys".if_supports_color(Stdout, |t| t.bold()),
    );
    println!(
        "  {}",
        "Press Enter to keep a value, '-' to remove it."
            .if_supports_color(Stdout, |t| t.dimmed()),
    );
    println!();

    let existing = ApiKeys::load();
    let stdin = std::io::stdin();
    let keys = prompt_all(&mut stdin.lock(), &existing)?;

    let path = artkeeper_scraper::config_path()
        .ok_or_else(|| CliError::config("Could not determine config directory"))?;
    let path = artkeeper_scraper::save_keys(&path, &keys)?;

    println!();
    log::info!(
        "{} Keys saved to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    if !keys.has_any() {
        log::warn!(
            "{} Without a TMDB or fanart.tv key only music artwork can be found",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
    }
    Ok(())
}
