//! Core type definitions for the deadlock guard
//!
//! These types provide strong typing for RTOS primitives.

use core::fmt;

/// Task priority (0 = highest priority)
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Option flags type
pub type OsOpt = u16;

/// Pend timeout meaning "block until acquired"
pub const WAIT_FOREVER: OsTick = 0;

/// Identity of a task as reported by the host kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a mutex created through the detector
///
/// Drawn from one process-wide counter at creation, so two detectors never
/// hand out the same id. Assigned whether or not the mutex made it into
/// the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockId(pub u32);

/// Outcome of registering a mutex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Registration {
    /// The mutex occupies registry slot `slot`
    Tracked { slot: usize },
    /// Registry was full; the mutex works but is never scanned
    Untracked,
}

impl Registration {
    #[inline]
    pub fn is_tracked(self) -> bool {
        matches!(self, Registration::Tracked { .. })
    }
}

// ============ Option flags ============

/// Pend options
pub mod opt {
    use super::OsOpt;

    pub const NONE: OsOpt = 0x0000;

    /// Wait up to the timeout for the mutex
    pub const PEND_BLOCKING: OsOpt = 0x0000;
    /// Fail with `PendWouldBlock` instead of waiting
    pub const PEND_NON_BLOCKING: OsOpt = 0x8000;
}
