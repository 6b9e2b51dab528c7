//! Progress display for long-running commands.
//!
//! Pipeline runs report through [`PipelineProgress`] events; this module
//! turns them into one `indicatif` bar that switches between a spinner
//! (unknown total) and a counted bar.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_lib::PipelineProgress;

const TICK: Duration = Duration::from_millis(100);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("/-\\|")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("/-\\|")
        .progress_chars("=> ")
}

/// A ticking spinner with a message. Hidden when `quiet`.
pub(crate) fn spinner(msg: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(msg.into());
    pb.enable_steady_tick(TICK);
    pb
}

/// A counted bar for `total` units. Hidden when `quiet`.
pub(crate) fn counter(total: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(bar_style());
    pb.enable_steady_tick(TICK);
    pb
}

/// Renders pipeline events on a single bar.
pub(crate) struct PipelineDisplay {
    bar: ProgressBar,
}

impl PipelineDisplay {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: spinner("Starting...", quiet),
        }
    }

    pub fn handle(&self, event: PipelineProgress) {
        match event {
            PipelineProgress::Phase { name, total } => {
                match total {
                    Some(total) => {
                        self.bar.set_style(bar_style());
                        self.bar.set_length(total);
                    }
                    None => self.bar.set_style(spinner_style()),
                }
                self.bar.set_position(0);
                self.bar.set_message(name);
            }
            PipelineProgress::Item { current, title, .. } => {
                self.bar.set_position(current);
                self.bar.set_message(title);
            }
            PipelineProgress::Found { description } => {
                self.bar.println(format!(
                    "  {} {}",
                    "\u{2022}".if_supports_color(Stdout, |t| t.dimmed()),
                    description,
                ));
            }
            PipelineProgress::Paused | PipelineProgress::Completed => {
                self.bar.finish_and_clear();
            }
        }
    }

    /// Pause drawing while `f` runs (for interactive prompts).
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
