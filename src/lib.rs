//! Deadlock guard for μC/OS-style RTOS mutexes
//!
//! Tracks every mutex created through the guard and the task holding it,
//! and resets the system when a mutex stays held past a configured threshold:
//! - Bounded mutex registry protected by a single guard lock
//! - Instrumented create / acquire / release wrappers
//! - Periodic monitor task scanning for stale holds
//! - Diagnostic report followed by a controlled system reset
//!
//! The scheduler and the raw mutex primitive are supplied by the host
//! through the [`port::Kernel`] trait.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(all(target_arch = "arm", not(feature = "std")))]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod monitor;
pub mod port;

#[cfg(all(feature = "std", not(feature = "defmt")))]
#[doc(hidden)]
pub use tracing as __tracing;

// ============ Re-exports ============

pub use crate::core::config;
pub use crate::core::config::*;
pub use crate::core::detector::Detector;
pub use crate::core::error;
pub use crate::core::error::{OsError, OsResult};
pub use crate::core::registry::{MutexRecord, Registry};
pub use crate::core::types;
pub use crate::core::types::*;

pub use crate::monitor::recovery::{ImplicatedTasks, Report};
pub use crate::monitor::{first_stale, StaleHold};
pub use crate::sync::guard::RegistryGuard;
pub use crate::sync::mutex::TrackedMutex;

pub use crate::port::{Console, Kernel, RawMutex, TaskEntry, TaskSpec};
