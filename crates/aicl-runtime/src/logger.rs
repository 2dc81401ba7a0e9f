//! Execution log.
//!
//! A thread-safe, append-only record of what a run did, separate from
//! operator diagnostics. Batches submitted together stay contiguous in the
//! final ordering, which is what lets one task's log lines read as a unit
//! even under concurrent execution.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;

/// One timestamped log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    fn new(message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            message,
        }
    }

    /// The entry returned for out-of-range reads: zero timestamp, empty
    /// message.
    pub fn empty() -> Self {
        Self {
            timestamp: DateTime::UNIX_EPOCH,
            message: String::new(),
        }
    }
}

/// Append-only log store.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<LogEntry>>,
}

impl Logger {
    /// Create a logger seeded with its initialization entry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(vec![LogEntry::new("Initialized Logger".to_string())]),
        }
    }

    /// Append a single entry.
    pub fn append(&self, message: impl Into<String>) {
        let entry = LogEntry::new(message.into());
        self.entries.lock().push(entry);
    }

    /// Append several entries as one contiguous run.
    pub fn append_batch<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let batch: Vec<LogEntry> = messages
            .into_iter()
            .map(|message| LogEntry::new(message.into()))
            .collect();
        self.entries.lock().extend(batch);
    }

    /// The entry at `index`, or the empty entry when out of range.
    pub fn at(&self, index: usize) -> LogEntry {
        self.entries
            .lock()
            .get(index)
            .cloned()
            .unwrap_or_else(LogEntry::empty)
    }

    /// Copy out all entries.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Print every entry as `[rfc3339-timestamp] message`.
    pub fn print_all(&self) {
        for entry in self.entries.lock().iter() {
            println!(
                "[{}] {}",
                entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                entry.message
            );
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_seed_entry() {
        let logger = Logger::new();
        assert_eq!(logger.len(), 1);
        assert_eq!(logger.at(0).message, "Initialized Logger");
    }

    #[test]
    fn test_append_preserves_order() {
        let logger = Logger::new();
        logger.append("first");
        logger.append("second");

        let entries = logger.snapshot();
        assert_eq!(entries[1].message, "first");
        assert_eq!(entries[2].message, "second");
        assert!(entries[1].timestamp <= entries[2].timestamp);
    }

    #[test]
    fn test_out_of_range_returns_empty() {
        let logger = Logger::new();
        let entry = logger.at(99);
        assert_eq!(entry.message, "");
        assert_eq!(entry.timestamp, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_batches_stay_contiguous() {
        let logger = Arc::new(Logger::new());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for round in 0..25 {
                        logger.append_batch([
                            format!("w{worker} r{round} begin"),
                            format!("w{worker} r{round} middle"),
                            format!("w{worker} r{round} end"),
                        ]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = logger.snapshot();
        assert_eq!(entries.len(), 1 + 4 * 25 * 3);
        for window in entries[1..].chunks(3) {
            let prefix = window[0]
                .message
                .rsplit_once(" begin")
                .map(|(head, _)| head.to_string())
                .expect("batch start out of position");
            assert_eq!(window[1].message, format!("{prefix} middle"));
            assert_eq!(window[2].message, format!("{prefix} end"));
        }
    }
}
