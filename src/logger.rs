//! Pluggable exchange logging.
//!
//! Every request produces a `debug` entry before it is sent and one entry
//! after the response is decoded. The [`Logger`] trait receives those
//! entries as structured JSON payloads.

use serde_json::Value;
use std::sync::Mutex;

/// Receives structured log entries from a [`Fetcher`](crate::Fetcher).
///
/// Logging is a side effect only. The methods return nothing and the fetcher
/// never inspects what a logger did, so a logger cannot fail a request. A
/// panic inside a logger is not caught and unwinds through the calling task.
pub trait Logger: Send + Sync {
    /// Logs a debug-level entry.
    fn debug(&self, entry: &Value);

    /// Logs an info-level entry.
    fn info(&self, entry: &Value);

    /// Logs a warn-level entry.
    fn warn(&self, entry: &Value);

    /// Logs an error-level entry.
    fn error(&self, entry: &Value);
}

/// Severity of a log entry, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Debug
    Debug,
    /// Info
    Info,
    /// Warn
    Warn,
    /// Error
    Error,
    /// Records nothing.
    Off,
}

/// Forwards entries to `tracing` under the `fetcher` target.
///
/// This is the logger a [`FetcherBuilder`](crate::FetcherBuilder) installs
/// when none is given. Entries go to whatever subscriber is installed; with
/// none, they are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, entry: &Value) {
        tracing::debug!(target: "fetcher", entry = %entry);
    }

    fn info(&self, entry: &Value) {
        tracing::info!(target: "fetcher", entry = %entry);
    }

    fn warn(&self, entry: &Value) {
        tracing::warn!(target: "fetcher", entry = %entry);
    }

    fn error(&self, entry: &Value) {
        tracing::error!(target: "fetcher", entry = %entry);
    }
}

/// Discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _entry: &Value) {}
    fn info(&self, _entry: &Value) {}
    fn warn(&self, _entry: &Value) {}
    fn error(&self, _entry: &Value) {}
}

/// A recorded log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Severity the entry was logged at.
    pub level: Level,
    /// The structured payload.
    pub entry: Value,
}

/// Keeps entries at or above a minimum [`Level`] in memory.
///
/// A poisoned lock is recovered, so recording keeps working after a thread
/// panicked while holding it.
///
/// # Examples
///
/// ```
/// use fetcher::logger::{Level, Logger, MemoryLogger};
/// use serde_json::json;
///
/// let logger = MemoryLogger::new(Level::Warn);
/// logger.debug(&json!("dropped"));
/// logger.error(&json!("kept"));
///
/// assert_eq!(logger.count(Level::Error), 1);
/// assert_eq!(logger.records().len(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryLogger {
    level: Level,
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    /// Creates a logger that records entries at `level` and above.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of the recorded entries.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Counts recorded entries at exactly `level`.
    pub fn count(&self, level: Level) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    fn record(&self, level: Level, entry: &Value) {
        if self.level == Level::Off || level < self.level {
            return;
        }
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(LogRecord {
                level,
                entry: entry.clone(),
            });
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new(Level::Debug)
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, entry: &Value) {
        self.record(Level::Debug, entry);
    }

    fn info(&self, entry: &Value) {
        self.record(Level::Info, entry);
    }

    fn warn(&self, entry: &Value) {
        self.record(Level::Warn, entry);
    }

    fn error(&self, entry: &Value) {
        self.record(Level::Error, entry);
    }
}
