//! Bounded ring buffer for transient on-screen entries
//!
//! Eviction is purely size based and oldest-first. Expiration only hides
//! entries from [`RingBuffer::render`]; expired entries keep occupying a slot
//! until they are evicted or the buffer is cleared.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use super::entry::LogEntry;

/// Default number of entries kept for display
pub const DEFAULT_MAX_ENTRIES: usize = 25;

/// FIFO ring buffer of log entries
#[derive(Debug, Clone)]
pub struct RingBuffer {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl RingBuffer {
    /// Create a new buffer; a capacity of zero is raised to one
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Current capacity bound
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the capacity bound
    ///
    /// Existing entries are not evicted here; a smaller bound is enforced on
    /// the next [`push`](Self::push).
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
    }

    /// Append an entry at the tail, evicting from the head while over capacity
    ///
    /// Returns the number of evicted entries.
    pub fn push(&mut self, entry: LogEntry) -> usize {
        self.entries.push_back(entry);
        let mut evicted = 0;
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Entries still visible at `now`, oldest first
    pub fn render(&self, now: DateTime<Local>) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter().filter(move |e| e.is_visible_at(now))
    }

    /// All entries, including expired ones, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry regardless of expiry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
