//! Registry guard
//!
//! Wraps the registry together with a host mutex so the registry can only be
//! reached while that mutex is held. The host mutex blocks; it never spins.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use crate::error::OsResult;
use crate::port::RawMutex;
use crate::types::{opt, WAIT_FOREVER};

/// Data reachable only through a held host mutex
pub struct RegistryGuard<M: RawMutex, T> {
    raw: M,
    data: UnsafeCell<T>,
}

// Access to `data` is serialized by `raw`.
unsafe impl<M: RawMutex + Sync, T: Send> Sync for RegistryGuard<M, T> {}
unsafe impl<M: RawMutex + Send, T: Send> Send for RegistryGuard<M, T> {}

impl<M: RawMutex, T> RegistryGuard<M, T> {
    pub const fn new(raw: M, data: T) -> Self {
        Self {
            raw,
            data: UnsafeCell::new(data),
        }
    }

    /// Block until the guard is held
    ///
    /// The returned handle releases the guard when dropped.
    pub fn lock(&self) -> OsResult<GuardRef<'_, M, T>> {
        self.raw.pend(WAIT_FOREVER, opt::PEND_BLOCKING)?;
        Ok(GuardRef { guard: self })
    }

    /// Run `f` with exclusive access to the data
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> OsResult<R> {
        let mut held = self.lock()?;
        Ok(f(&mut held))
    }
}

/// Exclusive access to guarded data; releases the guard on drop
pub struct GuardRef<'a, M: RawMutex, T> {
    guard: &'a RegistryGuard<M, T>,
}

impl<M: RawMutex, T> Deref for GuardRef<'_, M, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard mutex is held for the lifetime of `self`.
        unsafe { &*self.guard.data.get() }
    }
}

impl<M: RawMutex, T> DerefMut for GuardRef<'_, M, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard mutex is held for the lifetime of `self`.
        unsafe { &mut *self.guard.data.get() }
    }
}

impl<M: RawMutex, T> Drop for GuardRef<'_, M, T> {
    fn drop(&mut self) {
        // Posting can only fail if another task owns the guard, which the
        // successful pend in `lock` rules out.
        let _ = self.guard.raw.post();
    }
}
