//! Conversion log, echoed to stderr and streamed over SSE.
//!
//! Pipeline steps report through [`log_info`] and friends. Every entry goes
//! to stderr (stdout stays free for CSV/JSON output) and to a broadcast
//! channel that `/api/logs` subscribers read from.

use chrono::Local;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffered entries per subscriber before the slowest one starts lagging.
const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "  ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "!",
            LogLevel::Error => "✗",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            time: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!("{} {} {}", self.time, self.level.prefix(), self.message)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to every connected SSE client.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn log(&self, entry: LogEntry) {
        eprintln!("{}", entry.render());

        // No receivers is the normal CLI case
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::new(LogLevel::Warning, "3 rows skipped"));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "3 rows skipped");
    }

    #[test]
    fn test_logging_without_subscribers_is_fine() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.log(LogEntry::new(LogLevel::Info, "nobody listening"));
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = LogEntry::new(LogLevel::Success, "Parsed 12 rows");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "Parsed 12 rows");
        assert_eq!(json["time"].as_str().unwrap().len(), 8);
    }
}
