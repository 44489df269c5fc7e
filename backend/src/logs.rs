//! Run log broadcasting and progress reporting.
//!
//! Every entry is echoed to stdout and sent on a broadcast channel so a
//! front end (or a test) can follow a conversion while it runs.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for grouped lines
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to stdout and every subscriber.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(entry.indent as usize);
        println!("{}{} {}", indent, prefix, entry.message);

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

// =============================================================================
// Progress
// =============================================================================

/// Observer for row-processing progress. Has no effect on the run itself.
pub trait ProgressSink: Send + Sync {
    /// `percent` is 0-100; `row` is the 1-based input row just processed.
    fn on_progress(&self, percent: u8, row: usize);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _percent: u8, _row: usize) {}
}

/// Logs progress every `every` rows.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ProgressSink for LogProgress {
    fn on_progress(&self, percent: u8, row: usize) {
        if row % self.every == 0 {
            log_info_indent(format!("{}% ({} rows)", percent, row), 1);
        }
    }
}

/// Percentage of `done` out of `total`, clamped to 100.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::new(LogLevel::Warning, "2 missing headers").with_indent(1));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "2 missing headers");
        assert_eq!(entry.indent, 1);
    }

    #[test]
    fn test_log_without_subscribers_does_not_panic() {
        LogBroadcaster::default().log(LogEntry::new(LogLevel::Info, "nobody listening"));
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Success, "done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["indent"], 0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(10, 10), 100);
        assert_eq!(percent(3, 0), 100);
    }
}
