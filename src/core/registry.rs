//! Mutex registry
//!
//! Fixed-capacity table of every mutex created through the detector. Slots
//! are filled in creation order and never freed, so the slot order is also
//! the scan order. The registry itself does no locking; every access goes
//! through [`RegistryGuard`](crate::sync::guard::RegistryGuard).

use crate::config::CFG_MAX_MUTEX_TRACKING;
use crate::types::{LockId, OsTick, Registration, TaskId};

/// Tracking state of one mutex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MutexRecord {
    /// Identity of the tracked mutex
    pub lock: LockId,
    /// Task currently holding the mutex
    pub holder: Option<TaskId>,
    /// Tick of the last acquisition; 0 while free
    pub acquired_at: OsTick,
    /// Label used in diagnostics
    pub name: Option<&'static str>,
}

impl MutexRecord {
    const fn new(lock: LockId, name: Option<&'static str>) -> Self {
        Self {
            lock,
            holder: None,
            acquired_at: 0,
            name,
        }
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    /// Ticks the mutex has been held at `now`, wrapping with the tick counter
    #[inline]
    pub fn held_for(&self, now: OsTick) -> Option<OsTick> {
        self.holder.map(|_| now.wrapping_sub(self.acquired_at))
    }
}

/// Bounded, append-only table of tracked mutexes
pub struct Registry<const N: usize = CFG_MAX_MUTEX_TRACKING> {
    records: [Option<MutexRecord>; N],
    len: usize,
}

impl<const N: usize> Registry<N> {
    pub const fn new() -> Self {
        Self {
            records: [None; N],
            len: 0,
        }
    }

    /// Number of tracked mutexes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Add a mutex in the next free slot
    ///
    /// Registering an already tracked lock returns its existing slot.
    pub fn register(&mut self, lock: LockId, name: Option<&'static str>) -> Registration {
        if let Some(slot) = self.find(lock) {
            return Registration::Tracked { slot };
        }
        if self.is_full() {
            return Registration::Untracked;
        }

        let slot = self.len;
        self.records[slot] = Some(MutexRecord::new(lock, name));
        self.len += 1;
        Registration::Tracked { slot }
    }

    /// Slot of `lock`, if tracked
    pub fn find(&self, lock: LockId) -> Option<usize> {
        self.iter().position(|rec| rec.lock == lock)
    }

    pub fn get(&self, slot: usize) -> Option<&MutexRecord> {
        self.records.get(slot).and_then(Option::as_ref)
    }

    /// Record that `holder` acquired `lock` at `now`
    ///
    /// Returns `false` when the lock is not tracked.
    pub fn mark_acquired(&mut self, lock: LockId, holder: TaskId, now: OsTick) -> bool {
        match self.record_mut(lock) {
            Some(rec) => {
                rec.holder = Some(holder);
                rec.acquired_at = now;
                true
            }
            None => false,
        }
    }

    /// Record that `releaser` released `lock`
    ///
    /// The record is only cleared while `releaser` is the recorded holder: a
    /// waiter the mutex was handed to may have booked its acquisition first.
    /// Returns `true` when the record changed.
    pub fn mark_released(&mut self, lock: LockId, releaser: TaskId) -> bool {
        match self.record_mut(lock) {
            Some(rec) if rec.holder == Some(releaser) => {
                rec.holder = None;
                rec.acquired_at = 0;
                true
            }
            _ => false,
        }
    }

    /// Tracked records in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MutexRecord> {
        self.records[..self.len].iter().flatten()
    }

    /// Records currently held by some task
    pub fn held(&self) -> impl Iterator<Item = &MutexRecord> {
        self.iter().filter(|rec| rec.is_held())
    }

    /// Records currently held by `task`
    pub fn held_by(&self, task: TaskId) -> impl Iterator<Item = &MutexRecord> {
        self.iter().filter(move |rec| rec.holder == Some(task))
    }

    fn record_mut(&mut self, lock: LockId) -> Option<&mut MutexRecord> {
        self.records[..self.len]
            .iter_mut()
            .flatten()
            .find(|rec| rec.lock == lock)
    }
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}
