//! A log implementation that keeps every message in memory
use log::{Level, Log, Metadata, Record, SetLoggerError};
use std::sync::Mutex;

pub struct SimLogger {
    max_log_level: Level,
    lines: Mutex<Vec<String>>,
}

impl SimLogger {
    pub const fn new(max_log_level: Level) -> SimLogger {
        SimLogger {
            max_log_level,
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Install this logger as the global one.
    ///
    /// Several tests in the same process may try this, only the first one succeeds.
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self).map(|_| log::set_max_level(self.max_log_level.to_level_filter()))
    }

    /// Every message logged so far, formatted as `LEVEL target: message`
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether any message logged so far contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_log_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!("{} {}: {}", record.level(), record.target(), record.args());
            eprintln!("{line}");
            self.lines
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(line);
        }
    }

    fn flush(&self) {}
}
