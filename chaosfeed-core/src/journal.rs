//! Bounded activity log.
//!
//! Holds the most recent engine messages, newest first, each rendered with a
//! `> ` prompt prefix.

use std::collections::VecDeque;

pub const LOG_CAPACITY: usize = 6;
const PREFIX: &str = "> ";

#[derive(Debug, Clone)]
pub struct ActivityLog {
    capacity: usize,
    entries: VecDeque<String>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, message: impl AsRef<str>) {
        self.entries.push_front(format!("{PREFIX}{}", message.as_ref()));
        self.entries.truncate(self.capacity);
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}
