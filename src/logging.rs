//! In-memory ring buffer of recent log records.
//!
//! Every record that passes the logger's filter is also kept here so that the
//! most recent lines can be attached to bug reports. The buffer is created by
//! [`crate::initialization::init_logger_with`] and lives for the whole process.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use crate::config::LOG_BUFFER_CAPACITY;

#[derive(Debug, Clone)]
struct Entry {
    at: Instant,
    level: log::Level,
    target: String,
    thread: String,
    message: String,
}

/// Fixed-capacity buffer of the most recent log records.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl LogBuffer {
    /// Creates a buffer holding [`LOG_BUFFER_CAPACITY`] records.
    pub fn new() -> Self {
        Self::with_capacity(LOG_BUFFER_CAPACITY)
    }

    /// Creates a buffer holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Stores a record, dropping the oldest one when full.
    pub fn push(&self, record: &log::Record<'_>) {
        let thread = std::thread::current();
        let entry = Entry {
            at: Instant::now(),
            level: record.level(),
            target: record.target().to_string(),
            thread: thread.name().unwrap_or("unnamed").to_string(),
            message: record.args().to_string(),
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if nothing has been logged yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Formats the buffered records, newest first.
    ///
    /// Each line starts with the record's age relative to now, in seconds.
    pub fn recent_messages(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .rev()
            .map(|entry| {
                let age = now.saturating_duration_since(entry.at).as_secs_f64();
                format!(
                    "{:>8.3}s [{:>16}] [{:>5}] {}: {}",
                    -age, entry.thread, entry.level, entry.target, entry.message
                )
            })
            .collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(buffer: &LogBuffer, level: log::Level, message: &str) {
        buffer.push(
            &log::Record::builder()
                .args(format_args!("{message}"))
                .level(level)
                .target("pr0gramm_transport::test")
                .build(),
        );
    }

    #[test]
    fn test_recent_messages_newest_first() {
        let buffer = LogBuffer::with_capacity(8);
        push(&buffer, log::Level::Info, "first");
        push(&buffer, log::Level::Warn, "second");

        let lines = buffer.recent_messages();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("pr0gramm_transport::test: second"));
        assert!(lines[0].contains("[ WARN]"));
        assert!(lines[1].ends_with("first"));
    }

    #[test]
    fn test_oldest_entries_are_dropped() {
        let buffer = LogBuffer::with_capacity(3);
        for i in 0..5 {
            push(&buffer, log::Level::Debug, &format!("message {i}"));
        }

        let lines = buffer.recent_messages();
        assert_eq!(buffer.len(), 3);
        assert!(lines[0].ends_with("message 4"));
        assert!(lines[2].ends_with("message 2"));
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = LogBuffer::new();
        assert!(buffer.is_empty());
        assert!(buffer.recent_messages().is_empty());
    }
}
