//! Port layer - host kernel interface
//!
//! The detector does not schedule tasks or implement blocking itself. The
//! host RTOS supplies those services by implementing [`Kernel`]; the raw
//! mutex it hands out implements [`RawMutex`].

use core::fmt;

use crate::error::OsResult;
use crate::types::{OsOpt, OsPrio, OsTick, TaskId};

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(feature = "std")]
pub mod sim;

/// Task entry point function type
pub type TaskEntry = fn(*const ()) -> !;

/// Parameters for creating a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskSpec {
    pub name: &'static str,
    pub prio: OsPrio,
    /// Stack size in words
    pub stk_size: usize,
}

/// Mutual exclusion primitive provided by the host
pub trait RawMutex {
    /// Acquire the mutex, waiting at most `timeout` ticks
    ///
    /// A timeout of [`WAIT_FOREVER`](crate::types::WAIT_FOREVER) blocks until
    /// the mutex is acquired. Expiry returns `Err(OsError::Timeout)`. With
    /// [`opt::PEND_NON_BLOCKING`](crate::types::opt::PEND_NON_BLOCKING) a
    /// taken mutex fails at once with `Err(OsError::PendWouldBlock)` and
    /// `timeout` is ignored.
    fn pend(&self, timeout: OsTick, pend_opt: OsOpt) -> OsResult<()>;

    /// Release the mutex held by the calling task
    fn post(&self) -> OsResult<()>;
}

/// Output channel for diagnostic reports
pub trait Console: fmt::Write {
    /// Push buffered output to the device
    fn flush(&mut self) {}
}

/// Scheduler services the detector depends on
pub trait Kernel {
    type Mutex: RawMutex;
    type Console: Console;

    /// Create a free mutex
    fn mutex_create(&self, name: &'static str) -> OsResult<Self::Mutex>;

    /// Create a task running `entry(arg)`
    ///
    /// # Safety
    /// `arg` must stay valid for the whole life of the task and must be
    /// safe to use from the new task.
    unsafe fn task_create(&self, spec: &TaskSpec, entry: TaskEntry, arg: *const ())
        -> OsResult<TaskId>;

    /// Identity of the calling task
    fn task_current(&self) -> TaskId;

    /// Name of a task, if the kernel knows it
    fn task_name(&self, task: TaskId) -> Option<&'static str>;

    /// Current tick count
    fn tick_get(&self) -> OsTick;

    /// Tick rate in Hz
    fn tick_rate_hz(&self) -> u32;

    /// Delay the calling task for `ticks`
    fn time_dly(&self, ticks: OsTick);

    /// Open the console diagnostic reports are written to
    fn console(&self) -> Self::Console;

    /// Reset the whole system; never returns
    fn system_reset(&self) -> !;

    /// Convert ticks to milliseconds
    fn ticks_to_ms(&self, ticks: OsTick) -> u32 {
        let hz = u64::from(self.tick_rate_hz().max(1));
        (u64::from(ticks) * 1000 / hz).min(u64::from(u32::MAX)) as u32
    }

    /// Convert milliseconds to ticks
    fn ms_to_ticks(&self, ms: u32) -> OsTick {
        let hz = u64::from(self.tick_rate_hz());
        (u64::from(ms) * hz / 1000).min(u64::from(OsTick::MAX)) as OsTick
    }
}
