use std::env;

use log::{self, LevelFilter, Metadata, Record};

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} {} - {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Environment variable read for the log level when none is given.
pub const LOG_ENV: &str = "SEABATTLE_LOG";

/// Installs the stderr logger. `level` wins over `SEABATTLE_LOG`; both
/// missing or invalid means `info`. Calling it twice is harmless.
pub fn init_logging(level: Option<LevelFilter>) {
    let level = level
        .or_else(|| env::var(LOG_ENV).ok().and_then(|lvl| lvl.parse().ok()))
        .unwrap_or(LevelFilter::Info);
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
