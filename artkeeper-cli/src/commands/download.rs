use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::util::format_bytes_approx;
use artkeeper_core::{ArtType, LibraryItem};
use artkeeper_lib::worker_queue::{MAX_WORKERS, MIN_WORKERS};
use artkeeper_lib::{
    DownloadJob, DownloadOutcome, DownloadQueue, Downloader, ExistingFileMode, download_path,
    resolve_workers,
};

use super::{Context, cancel_on_ctrl_c, runtime};
use crate::CliError;
use crate::cli_types::MediaArgs;
use crate::spinner;

/// One job per filled artwork slot of each item in scope.
fn plan_jobs(
    items: &[LibraryItem],
    root: &Path,
    art_types: Option<&[ArtType]>,
    mode: ExistingFileMode,
) -> Vec<DownloadJob> {
    let mut jobs = Vec::new();
    for item in items {
        for (art_type, url) in &item.art {
            if url.trim().is_empty() || !url.starts_with("http") {
                continue;
            }
            if art_types.is_some_and(|wanted| !wanted.contains(art_type)) {
                continue;
            }
            jobs.push(DownloadJob {
                url: url.clone(),
                dest_base: download_path(root, item.kind, &item.title, item.dbid, *art_type),
                art_type: *art_type,
                mode,
            });
        }
    }
    jobs
}

/// Save the library's current artwork under a local folder.
pub(crate) fn run_download(
    ctx: &Context,
    media: &MediaArgs,
    dir: Option<PathBuf>,
    existing: Option<ExistingFileMode>,
    art_types: Option<Vec<ArtType>>,
    workers: Option<usize>,
) -> Result<(), CliError> {
    let root = dir
        .or_else(|| ctx.settings.artwork.download_dir.clone())
        .ok_or_else(|| {
            CliError::config("No download folder; pass --dir or set artwork.download_dir")
        })?;
    let mode = existing.unwrap_or(ctx.settings.artwork.existing_files);
    let workers = workers
        .map(|n| n.clamp(MIN_WORKERS, MAX_WORKERS))
        .unwrap_or_else(|| resolve_workers(&ctx.settings));

    let kinds = media.kinds();
    let library = ctx.open_library()?;
    let items: Vec<LibraryItem> = library
        .snapshot()
        .into_iter()
        .filter(|i| kinds.contains(&i.kind))
        .collect();
    let jobs = plan_jobs(&items, &root, art_types.as_deref(), mode);
    if jobs.is_empty() {
        log::info!("No artwork to download for {}", media.label());
        return Ok(());
    }
    log::info!(
        "Downloading {} files to {} ({} workers, existing files: {})",
        jobs.len(),
        root.display().if_supports_color(Stdout, |t| t.cyan()),
        workers,
        mode.as_str(),
    );

    let rt = runtime()?;
    rt.block_on(async {
        let cancel = cancel_on_ctrl_c();
        let downloader = Downloader::http()?.with_cancel(cancel);
        let mut queue = DownloadQueue::new(downloader, workers);
        let mut submitted = 0u64;
        for job in jobs {
            if queue.submit(job) {
                submitted += 1;
            }
        }
        queue.start()?;
        queue.stop(true);

        let pb = spinner::counter(submitted, ctx.quiet);
        while let Some(result) = queue.recv().await {
            pb.inc(1);
            match &result.outcome {
                Ok(DownloadOutcome::Downloaded { path, .. }) => {
                    pb.set_message(path.display().to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    pb.suspend(|| {
                        log::warn!(
                            "  {} {}: {}",
                            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                            result.key,
                            e
                        );
                    });
                }
            }
        }
        pb.finish_and_clear();
        let (_, stats) = queue.finish().await;

        crate::log_blank();
        log::info!(
            "{} Downloaded {} ({}), skipped {}, reused {}, failed {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            stats.downloaded,
            format_bytes_approx(stats.bytes),
            stats.skipped,
            stats.reused,
            stats.failed,
        );
        for (folder, count) in &stats.per_folder {
            log::debug!("  {}: {}", folder.display(), count);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use artkeeper_core::MediaKind;

    #[test]
    fn plans_one_job_per_remote_slot() {
        let mut item = LibraryItem::new(MediaKind::Movie, 7, "Alien: Covenant");
        item.art.insert(ArtType::Poster, "https://img.test/p.jpg".into());
        item.art.insert(ArtType::Fanart, "https://img.test/f.jpg".into());
        item.art.insert(ArtType::Thumb, "image://local/thumb.jpg".into());
        item.art.insert(ArtType::Banner, " ".into());

        let root = Path::new("/art");
        let jobs = plan_jobs(&[item.clone()], root, None, ExistingFileMode::Skip);
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.dest_base.starts_with("/art/movie")));

        let posters = plan_jobs(&[item], root, Some(&[ArtType::Poster]), ExistingFileMode::Overwrite);
        assert_eq!(posters.len(), 1);
        assert_eq!(posters[0].mode, ExistingFileMode::Overwrite);
    }
}
