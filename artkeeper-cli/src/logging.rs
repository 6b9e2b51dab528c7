//! Logger setup: plain messages on stdout, optional ANSI-free log file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Writes every log line to stdout and, when set, to a file with colour
/// codes removed.
struct Tee {
    file: Option<strip_ansi_escapes::Writer<File>>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        if let Some(file) = &mut self.file {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global logger.
///
/// Normal runs print bare messages at info level; `verbose` adds
/// timestamps, levels and debug output; `quiet` keeps warnings and errors
/// only. `RUST_LOG` still refines per-module filters.
pub(crate) fn init(verbose: bool, quiet: bool, logfile: Option<&Path>) -> io::Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let file = logfile
        .map(File::create)
        .transpose()?
        .map(strip_ansi_escapes::Writer::new);

    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        // Prefix match: covers the binary and every artkeeper_* crate.
        .filter_module("artkeeper", level)
        .parse_default_env()
        .target(Target::Pipe(Box::new(Tee { file })));

    if verbose {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }

    builder.try_init().map_err(io::Error::other)
}
