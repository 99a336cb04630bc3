//! Pending event and clock state.
//!
//! Registries are plain data structures: the scheduler guards them with its
//! mutex and the dispatcher loop is the only caller of the `pop_due` methods.
//! Each registry pairs a [`HandleAllocator`] holding the entries with a
//! [`DueTimeCollection`] ordering their handles by due time.

use std::sync::Arc;
use std::time::Duration;

use crate::core::due_time::{DueKey, DueTimeCollection};
use crate::core::handle::{ClockHandle, EventHandle, EventKey, HandleAllocator};
use crate::infra::queue::DueTimeQueue;
use crate::util::clock::Timestamp;

/// One-shot callback stored with an event.
pub(crate) type EventCallback = Box<dyn FnOnce() + Send + 'static>;

/// Repeatable callback stored with a clock.
pub(crate) type ClockCallback = Arc<dyn Fn() + Send + Sync + 'static>;

pub(crate) struct EventEntry {
    key: EventKey,
    slot: DueKey,
    callback: EventCallback,
}

impl EventEntry {
    pub(crate) fn into_callback(self) -> EventCallback {
        self.callback
    }
}

/// Pending one-shot events ordered by due time.
#[derive(Default)]
pub(crate) struct EventRegistry {
    entries: HandleAllocator<EventEntry>,
    queue: DueTimeQueue<EventHandle>,
}

impl EventRegistry {
    pub(crate) fn insert(
        &mut self,
        due: Timestamp,
        key: EventKey,
        callback: EventCallback,
    ) -> EventHandle {
        let handle = EventHandle(self.entries.insert(EventEntry {
            key,
            slot: DueKey::default(),
            callback,
        }));
        let slot = self.queue.insert(due, handle);
        if let Some(entry) = self.entries.get_mut(handle.0) {
            entry.slot = slot;
        }
        handle
    }

    fn matches(&self, handle: EventHandle, key: EventKey) -> bool {
        self.entries
            .get(handle.0)
            .is_some_and(|entry| entry.key == key)
    }

    /// Remove a pending event. Returns its due time along with the entry.
    pub(crate) fn remove(
        &mut self,
        handle: EventHandle,
        key: EventKey,
    ) -> Option<(Timestamp, EventEntry)> {
        if !self.matches(handle, key) {
            return None;
        }
        let entry = self.entries.remove(handle.0)?;
        self.queue.remove(&entry.slot);
        Some((entry.slot.due, entry))
    }

    /// Move a pending event to `new_due`. The event is ordered after any
    /// entry already due at the same instant.
    pub(crate) fn reschedule(
        &mut self,
        handle: EventHandle,
        key: EventKey,
        new_due: Timestamp,
    ) -> bool {
        if !self.matches(handle, key) {
            return false;
        }
        let Some(entry) = self.entries.get_mut(handle.0) else {
            return false;
        };
        self.queue.remove(&entry.slot);
        entry.slot = self.queue.insert(new_due, handle);
        true
    }

    pub(crate) fn peek_earliest(&self) -> Option<DueKey> {
        self.queue.peek_earliest().map(|(slot, _)| slot)
    }

    /// Pop the earliest event if it is due at `now`.
    pub(crate) fn pop_due(&mut self, now: Timestamp) -> Option<(EventHandle, EventEntry)> {
        let (slot, _) = self.queue.peek_earliest()?;
        if slot.due > now {
            return None;
        }
        let (_, handle) = self.queue.pop_earliest()?;
        let entry = self.entries.remove(handle.0)?;
        Some((handle, entry))
    }

    /// Remove every pending event. Callbacks are handed back so the caller
    /// can drop them outside its lock.
    pub(crate) fn drain(&mut self) -> Vec<EventEntry> {
        self.queue.clear();
        self.entries.drain()
    }

    /// Number of pending events.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) struct ClockEntry {
    period: Duration,
    slot: DueKey,
    callback: ClockCallback,
}

/// Registered recurring clocks ordered by next due time.
#[derive(Default)]
pub(crate) struct ClockRegistry {
    entries: HandleAllocator<ClockEntry>,
    queue: DueTimeQueue<ClockHandle>,
}

impl ClockRegistry {
    pub(crate) fn insert(
        &mut self,
        first_due: Timestamp,
        period: Duration,
        callback: ClockCallback,
    ) -> ClockHandle {
        let handle = ClockHandle(self.entries.insert(ClockEntry {
            period,
            slot: DueKey::default(),
            callback,
        }));
        let slot = self.queue.insert(first_due, handle);
        if let Some(entry) = self.entries.get_mut(handle.0) {
            entry.slot = slot;
        }
        handle
    }

    /// Unregister a clock. Returns its next due time along with the entry.
    pub(crate) fn remove(&mut self, handle: ClockHandle) -> Option<(Timestamp, ClockEntry)> {
        let entry = self.entries.remove(handle.0)?;
        self.queue.remove(&entry.slot);
        Some((entry.slot.due, entry))
    }

    pub(crate) fn peek_earliest(&self) -> Option<DueKey> {
        self.queue.peek_earliest().map(|(slot, _)| slot)
    }

    /// Fire the earliest clock if it is due at `now`.
    ///
    /// The clock is rearmed at [`next_clock_due`] before its callback is
    /// returned, so it stays registered while the callback runs.
    pub(crate) fn pop_due(&mut self, now: Timestamp) -> Option<(ClockHandle, ClockCallback)> {
        let (slot, _) = self.queue.peek_earliest()?;
        if slot.due > now {
            return None;
        }
        let (fired, handle) = self.queue.pop_earliest()?;
        let entry = self.entries.get_mut(handle.0)?;
        let next_due = next_clock_due(fired.due, entry.period, now);
        entry.slot = self.queue.insert(next_due, handle);
        Some((handle, Arc::clone(&entry.callback)))
    }

    /// Next due time of a registered clock.
    pub(crate) fn next_due(&self, handle: ClockHandle) -> Option<Timestamp> {
        self.entries.get(handle.0).map(|entry| entry.slot.due)
    }

    pub(crate) fn drain(&mut self) -> Vec<ClockEntry> {
        self.queue.clear();
        self.entries.drain()
    }

    /// Number of registered clocks.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

}

/// Next due time of a clock that was due at `previous` and fired at `now`.
///
/// On schedule, this is `previous + period`. A clock that fell behind by a
/// period or more is rearmed one period after `now` instead, so it fires once
/// and resumes rather than replaying every missed tick.
#[must_use]
pub(crate) fn next_clock_due(previous: Timestamp, period: Duration, now: Timestamp) -> Timestamp {
    let on_schedule = previous + period;
    if on_schedule > now {
        on_schedule
    } else {
        now + period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_event() -> EventCallback {
        Box::new(|| {})
    }

    fn noop_clock() -> ClockCallback {
        Arc::new(|| {})
    }

    fn secs(s: u64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    #[test]
    fn test_next_clock_due_on_schedule() {
        let period = Duration::from_secs(10);
        assert_eq!(next_clock_due(secs(10), period, secs(10)), secs(20));
        assert_eq!(next_clock_due(secs(10), period, secs(19)), secs(20));
    }

    #[test]
    fn test_next_clock_due_catches_up_without_backlog() {
        let period = Duration::from_secs(10);
        // Due at 10, not serviced until 45: three periods missed.
        assert_eq!(next_clock_due(secs(10), period, secs(45)), secs(55));
        // Exactly one period late.
        assert_eq!(next_clock_due(secs(10), period, secs(20)), secs(30));
    }

    #[test]
    fn test_event_pop_respects_due_time() {
        let mut reg: EventRegistry = EventRegistry::default();
        reg.insert(secs(5), EventKey::default(), noop_event());

        assert!(reg.pop_due(secs(4)).is_none());
        assert!(reg.pop_due(secs(5)).is_some());
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn test_event_ties_pop_in_insertion_order() {
        let mut reg: EventRegistry = EventRegistry::default();
        let a = reg.insert(secs(5), EventKey::default(), noop_event());
        let b = reg.insert(secs(5), EventKey::default(), noop_event());
        let c = reg.insert(secs(1), EventKey::default(), noop_event());

        let order: Vec<_> = std::iter::from_fn(|| reg.pop_due(secs(10)).map(|(h, _)| h)).collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn test_event_remove_requires_matching_key() {
        let mut reg: EventRegistry = EventRegistry::default();
        let h = reg.insert(secs(5), EventKey::new(456), noop_event());

        assert!(reg.remove(h, EventKey::new(123)).is_none());
        assert!(reg.remove(h, EventKey::default()).is_none());
        let (due, _) = reg.remove(h, EventKey::new(456)).unwrap();
        assert_eq!(due, secs(5));
        assert!(reg.remove(h, EventKey::new(456)).is_none());
    }

    #[test]
    fn test_event_reschedule_moves_entry() {
        let mut reg: EventRegistry = EventRegistry::default();
        let late = reg.insert(secs(10), EventKey::default(), noop_event());
        let early = reg.insert(secs(5), EventKey::default(), noop_event());

        assert!(reg.reschedule(late, EventKey::default(), secs(1)));
        assert_eq!(reg.peek_earliest().unwrap().due, secs(1));

        let (first, _) = reg.pop_due(secs(20)).unwrap();
        assert_eq!(first, late);
        let (second, _) = reg.pop_due(secs(20)).unwrap();
        assert_eq!(second, early);

        assert!(!reg.reschedule(late, EventKey::default(), secs(30)));
    }

    #[test]
    fn test_event_drain_returns_callbacks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut reg: EventRegistry = EventRegistry::default();
        for i in 0..3 {
            let hits = Arc::clone(&hits);
            reg.insert(secs(i), EventKey::default(), Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let drained = reg.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(reg.len(), 0);
        assert!(reg.peek_earliest().is_none());
        for entry in drained {
            entry.into_callback()();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_clock_rearms_before_returning_callback() {
        let mut reg: ClockRegistry = ClockRegistry::default();
        let h = reg.insert(secs(10), Duration::from_secs(10), noop_clock());

        assert!(reg.pop_due(secs(9)).is_none());
        let (fired, _) = reg.pop_due(secs(10)).unwrap();
        assert_eq!(fired, h);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.next_due(h), Some(secs(20)));
    }

    #[test]
    fn test_delayed_clock_fires_once() {
        let mut reg: ClockRegistry = ClockRegistry::default();
        let h = reg.insert(secs(10), Duration::from_secs(10), noop_clock());

        assert!(reg.pop_due(secs(45)).is_some());
        assert!(reg.pop_due(secs(45)).is_none());
        assert_eq!(reg.next_due(h), Some(secs(55)));
    }

    #[test]
    fn test_clock_remove() {
        let mut reg: ClockRegistry = ClockRegistry::default();
        let h = reg.insert(secs(3), Duration::from_secs(1), noop_clock());
        let (due, _) = reg.remove(h).unwrap();
        assert_eq!(due, secs(3));
        assert!(reg.remove(h).is_none());
        assert!(reg.pop_due(secs(100)).is_none());
    }
}
