//! Abstraction over the time-ordered collection backing each registry.

use crate::util::clock::Timestamp;

/// Position of an entry inside a [`DueTimeCollection`].
///
/// Keys order by due time, then by insertion sequence, so two entries due at
/// the same instant come out in the order they went in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DueKey {
    /// Absolute time the entry becomes eligible.
    pub due: Timestamp,
    /// Insertion sequence number assigned by the collection.
    pub seq: u64,
}

/// Ordered container of values keyed by due time.
///
/// Implementations must provide O(log n) or better `insert`, `remove` and
/// `peek_earliest`, and must assign strictly increasing `seq` values.
pub trait DueTimeCollection<V>: Send {
    /// Insert `value` due at `due`, returning the key to remove it later.
    fn insert(&mut self, due: Timestamp, value: V) -> DueKey;

    /// Remove the value stored under `key`.
    fn remove(&mut self, key: &DueKey) -> Option<V>;

    /// The earliest entry, without removing it.
    fn peek_earliest(&self) -> Option<(DueKey, &V)>;

    /// Remove and return the earliest entry.
    fn pop_earliest(&mut self) -> Option<(DueKey, V)>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// True if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove everything.
    fn clear(&mut self);
}
