//! Generation-checked handles for scheduled events and clocks.
//!
//! Handles index into a slot arena. Every slot carries a generation that is
//! bumped when its value is removed, so a stale handle never resolves to the
//! entry that later reuses the same slot.

use std::fmt;

/// Raw arena reference shared by [`EventHandle`] and [`ClockHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotHandle {
    index: usize,
    generation: u64,
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

/// Opaque reference to a scheduled one-shot event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(pub(crate) SlotHandle);

/// Opaque reference to a registered recurring clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockHandle(pub(crate) SlotHandle);

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

impl fmt::Display for ClockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clock#{}", self.0)
    }
}

/// Caller-supplied disambiguator attached to an event.
///
/// Operations that take a key only match an event scheduled with the same
/// key. Operations without a key use [`EventKey::default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventKey(i64);

impl EventKey {
    /// Wrap a raw key value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw key value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for EventKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// Slot arena that hands out [`SlotHandle`]s.
///
/// Insert, lookup and removal are O(1). Freed slots are reused LIFO.
#[derive(Debug)]
pub(crate) struct HandleAllocator<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Default for HandleAllocator<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> HandleAllocator<T> {
    pub(crate) fn insert(&mut self, value: T) -> SlotHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            return SlotHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SlotHandle {
            index,
            generation: 0,
        }
    }

    fn live_slot(&self, handle: SlotHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    pub(crate) fn get(&self, handle: SlotHandle) -> Option<&T> {
        self.live_slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn remove(&mut self, handle: SlotHandle) -> Option<T> {
        self.live_slot(handle)?;
        let slot = &mut self.slots[handle.index];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    /// Remove every live value, invalidating all outstanding handles.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                values.push(value);
            }
        }
        self.len = 0;
        values
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}
