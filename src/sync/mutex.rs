//! Instrumented mutex API
//!
//! Drop-in replacements for the host's create / pend / post that keep the
//! registry in step with who holds which mutex. Blocking behavior is exactly
//! the host primitive's; the registry guard is only taken after the host
//! call has returned, never while waiting on an application mutex.

use portable_atomic::{AtomicU32, Ordering};

use crate::core::detector::Detector;
use crate::error::{OsError, OsResult};
use crate::port::{Kernel, RawMutex};
use crate::types::{opt, LockId, OsOpt, OsTick, Registration};

/// Shared by every detector so a handle can never alias another
/// detector's record
static NEXT_LOCK: AtomicU32 = AtomicU32::new(1);

fn alloc_lock_id() -> LockId {
    LockId(NEXT_LOCK.fetch_add(1, Ordering::Relaxed))
}

/// Host mutex created through the detector
pub struct TrackedMutex<M: RawMutex> {
    raw: M,
    id: LockId,
    name: &'static str,
    registration: Registration,
}

impl<M: RawMutex> TrackedMutex<M> {
    #[inline]
    pub fn id(&self) -> LockId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the mutex made it into the registry
    #[inline]
    pub fn registration(&self) -> Registration {
        self.registration
    }

    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.registration.is_tracked()
    }

    /// The underlying host mutex
    #[inline]
    pub fn raw(&self) -> &M {
        &self.raw
    }
}

impl<K: Kernel, const N: usize> Detector<K, N> {
    /// Create a mutex and register it for deadlock detection
    ///
    /// A full registry does not fail the call: the mutex is returned
    /// untracked and a warning is logged.
    pub fn create(&self, name: &'static str) -> OsResult<TrackedMutex<K::Mutex>> {
        let raw = self
            .kernel
            .mutex_create(name)
            .map_err(|_| OsError::ObjCreate)?;
        let id = alloc_lock_id();

        let registered = self
            .lock_registry()
            .map(|mut registry| registry.register(id, Some(name)));

        let registration = match registered {
            Some(Registration::Tracked { slot }) => {
                crate::debug!("mutex {} tracked in slot {}", name, slot);
                Registration::Tracked { slot }
            }
            Some(Registration::Untracked) => {
                crate::warn!("mutex registry full, {} is not tracked", name);
                Registration::Untracked
            }
            None => {
                crate::warn!("registry guard unavailable, {} is not tracked", name);
                Registration::Untracked
            }
        };

        Ok(TrackedMutex {
            raw,
            id,
            name,
            registration,
        })
    }

    /// Acquire `mutex`, waiting at most `timeout` ticks
    ///
    /// Returns the host's result unchanged. The holder is recorded only when
    /// the host reports success.
    pub fn acquire(&self, mutex: &TrackedMutex<K::Mutex>, timeout: OsTick) -> OsResult<()> {
        self.acquire_opt(mutex, timeout, opt::PEND_BLOCKING)
    }

    /// Acquire `mutex` with explicit pend options
    ///
    /// `opt::PEND_NON_BLOCKING` turns the call into a try-lock that fails
    /// with `PendWouldBlock` when the mutex is taken.
    pub fn acquire_opt(
        &self,
        mutex: &TrackedMutex<K::Mutex>,
        timeout: OsTick,
        pend_opt: OsOpt,
    ) -> OsResult<()> {
        mutex.raw.pend(timeout, pend_opt)?;

        if mutex.is_tracked() {
            let holder = self.kernel.task_current();
            if let Some(mut registry) = self.lock_registry() {
                let now = self.kernel.tick_get();
                registry.mark_acquired(mutex.id, holder, now);
            }
        }
        Ok(())
    }

    /// Release `mutex`
    ///
    /// Ownership checks are left to the host primitive; the holder is
    /// cleared only when the host accepted the release.
    pub fn release(&self, mutex: &TrackedMutex<K::Mutex>) -> OsResult<()> {
        let releaser = self.kernel.task_current();
        mutex.raw.post()?;

        if mutex.is_tracked() {
            if let Some(mut registry) = self.lock_registry() {
                registry.mark_released(mutex.id, releaser);
            }
        }
        Ok(())
    }
}
