//! In-memory due-time queue.

use std::collections::BTreeMap;

use crate::core::due_time::{DueKey, DueTimeCollection};
use crate::util::clock::Timestamp;

/// In-memory queue storing values in due-time order using a B-tree.
/// This provides O(log n) insert, removal by key and pop of the earliest entry.
#[derive(Debug)]
pub struct DueTimeQueue<V> {
    entries: BTreeMap<DueKey, V>,
    next_seq: u64,
}

impl<V> DueTimeQueue<V> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Earliest due time, if any entry is stored.
    #[must_use]
    pub fn next_due(&self) -> Option<Timestamp> {
        self.entries.first_key_value().map(|(key, _)| key.due)
    }
}

impl<V> Default for DueTimeQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send> DueTimeCollection<V> for DueTimeQueue<V> {
    fn insert(&mut self, due: Timestamp, value: V) -> DueKey {
        let key = DueKey {
            due,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, value);
        key
    }

    fn remove(&mut self, key: &DueKey) -> Option<V> {
        self.entries.remove(key)
    }

    fn peek_earliest(&self) -> Option<(DueKey, &V)> {
        self.entries.first_key_value().map(|(key, value)| (*key, value))
    }

    fn pop_earliest(&mut self) -> Option<(DueKey, V)> {
        self.entries.pop_first()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
