use std::io::{self, BufRead, Write};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use artkeeper_core::Candidate;
use artkeeper_lib::{ReviewChoice, ReviewOptions, ReviewPrompt, Reviewer};
use artkeeper_scraper::FetchOptions;

use super::{Context, cancel_on_ctrl_c, pick_session, print_report, runtime, truncate_str};
use crate::CliError;
use crate::cli_types::{KeyArgs, MediaArgs};
use crate::spinner::PipelineDisplay;

/// Reads choices from a line-oriented input.
struct TerminalReviewer<R> {
    input: R,
}

fn describe(index: usize, c: &Candidate) -> String {
    let mut parts = vec![c.provider.display_name().to_string()];
    parts.push(c.language.clone().unwrap_or_else(|| "no text".to_string()));
    if c.width > 0 && c.height > 0 {
        parts.push(format!("{}x{}", c.width, c.height));
    }
    if c.rating > 0.0 {
        parts.push(format!("{:.1} ({} votes)", c.rating, c.vote_count));
    } else if c.likes > 0 {
        parts.push(format!("{} likes", c.likes));
    }
    format!(
        "  {:>3}. {}  {}",
        index + 1,
        parts.join(", "),
        truncate_str(&c.url, 70).if_supports_color(Stdout, |t| t.dimmed()),
    )
}

/// Parse one answer against a list of `shown` candidates.
fn parse_choice(line: &str, shown: usize) -> Option<ReviewChoice> {
    match line.trim().to_lowercase().as_str() {
        "" | "1" if shown > 0 => Some(ReviewChoice::Apply(0)),
        "s" | "skip" => Some(ReviewChoice::Skip),
        "i" | "item" => Some(ReviewChoice::SkipItem),
        "a" | "all" => Some(ReviewChoice::ShowAll),
        "q" | "quit" => Some(ReviewChoice::Quit),
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 && n <= shown => Some(ReviewChoice::Apply(n - 1)),
            _ => None,
        },
    }
}

impl<R: BufRead> Reviewer for TerminalReviewer<R> {
    fn choose(&mut self, prompt: &ReviewPrompt<'_>) -> ReviewChoice {
        println!();
        let year = prompt.item.year.map(|y| format!(" ({y})")).unwrap_or_default();
        println!(
            "{}{} {}",
            prompt.item.title.if_supports_color(Stdout, |t| t.bold()),
            year,
            format!("[{}]", prompt.art_type).if_supports_color(Stdout, |t| t.cyan()),
        );
        for (i, c) in prompt.candidates.iter().enumerate() {
            println!("{}", describe(i, c));
        }
        let mut hint = String::from("[number] apply (Enter = 1), s skip, i skip item, q quit");
        if prompt.filtered && prompt.hidden > 0 {
            hint.push_str(&format!(", a show all (+{} hidden)", prompt.hidden));
        }

        loop {
            print!("{} > ", hint.if_supports_color(Stdout, |t| t.dimmed()));
            if io::stdout().flush().is_err() {
                return ReviewChoice::Quit;
            }
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return ReviewChoice::Quit,
                Ok(_) => {}
            }
            match parse_choice(&line, prompt.candidates.len()) {
                Some(ReviewChoice::ShowAll) if !prompt.filtered => {
                    println!("Already showing every candidate.");
                }
                Some(choice) => return choice,
                None => println!("Unrecognised answer '{}'", line.trim()),
            }
        }
    }
}

/// Walk the queue and ask for each missing slot.
pub(crate) fn run_review(
    ctx: &Context,
    media: &MediaArgs,
    session: Option<i64>,
    auto_single: bool,
    refresh: bool,
    keys: &KeyArgs,
) -> Result<(), CliError> {
    let rt = runtime()?;
    rt.block_on(async {
        let cancel = cancel_on_ctrl_c();
        let pipeline = ctx.pipeline(keys, cancel)?;
        // Prompts own the terminal; no progress bar while reviewing.
        let display = PipelineDisplay::new(true);

        let Some(session_id) = pick_session(&pipeline, media, session, &display)? else {
            return Ok(());
        };
        let opts = ReviewOptions {
            fetch: FetchOptions {
                bypass_cache: refresh,
            },
            auto_single,
        };
        let mut reviewer = TerminalReviewer {
            input: io::stdin().lock(),
        };
        let report = pipeline
            .review(session_id, &mut reviewer, opts, &|p| display.handle(p))
            .await;
        pipeline.shutdown();

        print_report(&report?);
        Ok(())
    })
}
