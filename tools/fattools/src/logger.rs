use std::env;
use std::io::{self, IsTerminal, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::{OwoColorize, Style};

/// Variable holding the log level (`error` .. `trace`, or `off`).
pub const LEVEL_VAR: &str = "FATTOOLS_LOG";

struct StderrLogger {
    colored: bool,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = record.level();
        let tag = format!("{level:5}");
        let target = record.target();
        let mut stderr = io::stderr().lock();
        // Logging must never take the tool down, so write errors are dropped.
        let _ = if self.colored {
            writeln!(
                stderr,
                "{} {} {}",
                tag.style(level_style(level)),
                target.dimmed(),
                record.args()
            )
        } else {
            writeln!(stderr, "{tag} {target} {}", record.args())
        };
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => Style::new().bright_red(),
        Level::Warn => Style::new().bright_yellow(),
        Level::Info => Style::new().bright_blue(),
        Level::Debug => Style::new().bright_cyan(),
        Level::Trace => Style::new().bright_magenta(),
    }
}

/// Level named by [`LEVEL_VAR`]; warnings and errors when unset or unparsable.
pub fn level_from_env() -> LevelFilter {
    parse_level(env::var(LEVEL_VAR).ok().as_deref())
}

fn parse_level(value: Option<&str>) -> LevelFilter {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(LevelFilter::Warn)
}

pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let logger: &'static StderrLogger = Box::leak(Box::new(StderrLogger {
        colored: io::stderr().is_terminal(),
    }));
    log::set_max_level(level);
    log::set_logger(logger)
}
