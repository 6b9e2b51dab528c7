use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_lib::ExistingFileMode;
use artkeeper_lib::settings::{load_settings_string, save_setting, settings_path};
use artkeeper_lib::worker_queue::{MAX_WORKERS, MIN_WORKERS};
use artkeeper_scraper::{ApiKeys, KeySource};

use super::Context;
use crate::CliError;

/// Keys `config set` accepts, as `section.key`.
const SETTABLE: &[&str] = &[
    "artwork.language",
    "artwork.download_dir",
    "artwork.existing_files",
    "artwork.max_workers",
    "storage.database",
];

pub(crate) fn mask_value(s: &str) -> String {
    if s.chars().count() <= 4 {
        "****".to_string()
    } else {
        let head: String = s.chars().take(4).collect();
        format!("{head}****")
    }
}

/// Split and validate `section.key`, checking `value` where the key has a
/// fixed format.
fn parse_setting<'a>(key: &'a str, value: Option<&str>) -> Result<(&'a str, &'a str), CliError> {
    if !SETTABLE.contains(&key) {
        return Err(CliError::config(format!(
            "Unknown setting '{key}'. Settable keys: {}",
            SETTABLE.join(", ")
        )));
    }
    let (section, name) = key
        .split_once('.')
        .ok_or_else(|| CliError::config(format!("'{key}' is not section.key")))?;

    if let Some(value) = value {
        match name {
            "existing_files" => {
                value.parse::<ExistingFileMode>().map_err(CliError::config)?;
            }
            "max_workers" => {
                let n: usize = value
                    .parse()
                    .map_err(|_| CliError::config(format!("'{value}' is not a number")))?;
                if !(MIN_WORKERS..=MAX_WORKERS).contains(&n) {
                    return Err(CliError::config(format!(
                        "max_workers must be between {MIN_WORKERS} and {MAX_WORKERS}"
                    )));
                }
            }
            _ => {}
        }
    }
    Ok((section, name))
}

fn log_key(name: &str, value: Option<&String>, source: &KeySource) {
    let source_str = format!("({source})");
    match value {
        Some(v) => log::info!(
            "  {} {} {}",
            format!("{name}:").if_supports_color(Stdout, |t| t.cyan()),
            mask_value(v),
            source_str.if_supports_color(Stdout, |t| t.dimmed()),
        ),
        None if *source == KeySource::Default => log::info!(
            "  {} {} {}",
            format!("{name}:").if_supports_color(Stdout, |t| t.cyan()),
            "public key",
            source_str.if_supports_color(Stdout, |t| t.dimmed()),
        ),
        None => log::info!(
            "  {} {} {}",
            format!("{name}:").if_supports_color(Stdout, |t| t.cyan()),
            "not set".if_supports_color(Stdout, |t| t.yellow()),
            source_str.if_supports_color(Stdout, |t| t.dimmed()),
        ),
    }
}

/// Show the effective settings and where each provider key comes from.
pub(crate) fn run_config_show(ctx: &Context) -> Result<(), CliError> {
    let path = settings_path();
    log::info!("{}", "Configuration".if_supports_color(Stdout, |t| t.bold()));
    crate::log_blank();
    let state = if path.exists() {
        "(exists)".if_supports_color(Stdout, |t| t.green()).to_string()
    } else {
        "(not found)".if_supports_color(Stdout, |t| t.dimmed()).to_string()
    };
    log::info!(
        "  Config file: {} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        state,
    );
    log::info!(
        "  Database:    {}",
        ctx.database_path().display().if_supports_color(Stdout, |t| t.cyan()),
    );
    crate::log_blank();

    let artwork = &ctx.settings.artwork;
    let unset = || "not set".if_supports_color(Stdout, |t| t.dimmed()).to_string();
    log::info!("{}", "[artwork]".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  language:       {}",
        artwork.language.clone().unwrap_or_else(unset)
    );
    log::info!(
        "  download_dir:   {}",
        artwork
            .download_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(unset)
    );
    log::info!("  existing_files: {}", artwork.existing_files.as_str());
    log::info!(
        "  max_workers:    {}",
        artwork
            .max_workers
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("auto ({})", artkeeper_lib::resolve_workers(&ctx.settings)))
    );
    crate::log_blank();

    let keys = ApiKeys::load();
    let sources = artkeeper_scraper::key_sources(Some(&path));
    log::info!("{}", "[providers]".if_supports_color(Stdout, |t| t.bold()));
    log_key("tmdb", keys.tmdb.as_ref(), &sources.tmdb);
    log_key("fanart", keys.fanart.as_ref(), &sources.fanart);
    log_key("audiodb", keys.audiodb.as_ref(), &sources.audiodb);

    if log::log_enabled!(log::Level::Debug) {
        if let Some(raw) = load_settings_string() {
            log::debug!("Raw config:\n{raw}");
        }
    }
    Ok(())
}

/// Set (`Some`) or remove (`None`) one setting.
pub(crate) fn run_config_set(key: &str, value: Option<&str>) -> Result<(), CliError> {
    let (section, name) = parse_setting(key, value)?;
    let path = settings_path();
    save_setting(&path, section, name, value)
        .map_err(|e| CliError::config(format!("Failed to save {}: {}", path.display(), e)))?;

    match value {
        Some(v) => log::info!(
            "{} {} = {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            key.if_supports_color(Stdout, |t| t.cyan()),
            v,
        ),
        None => log::info!(
            "{} {} removed",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            key.if_supports_color(Stdout, |t| t.cyan()),
        ),
    }
    Ok(())
}

/// Print the config file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    log::info!("{}", settings_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_a_prefix() {
        assert_eq!(mask_value("abc"), "****");
        assert_eq!(mask_value("0123456789"), "0123****");
    }

    #[test]
    fn settings_keys_are_checked() {
        assert_eq!(
            parse_setting("artwork.language", Some("de")).unwrap(),
            ("artwork", "language")
        );
        assert!(parse_setting("artwork.colour", Some("red")).is_err());
        assert!(parse_setting("artwork.max_workers", Some("20")).is_err());
        assert!(parse_setting("artwork.max_workers", Some("four")).is_err());
        assert!(parse_setting("artwork.existing_files", Some("merge")).is_err());
        assert!(parse_setting("artwork.existing_files", Some("use-existing")).is_ok());
        // Unset skips value checks.
        assert!(parse_setting("artwork.max_workers", None).is_ok());
    }
}
