//! Simulated RTOS mutex
//!
//! Non-recursive: a second pend by the owner is rejected instead of
//! deadlocking the task on itself.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::{thread_task, ticks_to_duration};
use crate::error::{OsError, OsResult};
use crate::port::RawMutex;
use crate::types::{opt, OsOpt, OsTick, TaskId, WAIT_FOREVER};

/// Owner-tracking mutex with tick timeouts
pub struct SimMutex {
    name: &'static str,
    owner: Mutex<Option<TaskId>>,
    released: Condvar,
    tick_rate_hz: u32,
}

impl SimMutex {
    pub(crate) fn new(name: &'static str, tick_rate_hz: u32) -> Self {
        Self {
            name,
            owner: Mutex::new(None),
            released: Condvar::new(),
            tick_rate_hz,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current owner, if any
    pub fn owner(&self) -> Option<TaskId> {
        *self.owner.lock()
    }
}

impl RawMutex for SimMutex {
    fn pend(&self, timeout: OsTick, pend_opt: OsOpt) -> OsResult<()> {
        let (me, _) = thread_task();
        let mut owner = self.owner.lock();

        if *owner == Some(me) {
            return Err(OsError::MutexOwner);
        }
        if owner.is_some() && pend_opt & opt::PEND_NON_BLOCKING != 0 {
            return Err(OsError::PendWouldBlock);
        }

        let deadline = (timeout != WAIT_FOREVER)
            .then(|| Instant::now() + ticks_to_duration(timeout, self.tick_rate_hz));

        while owner.is_some() {
            match deadline {
                Some(deadline) => {
                    let result = self.released.wait_until(&mut owner, deadline);
                    if result.timed_out() && owner.is_some() {
                        return Err(OsError::Timeout);
                    }
                }
                None => self.released.wait(&mut owner),
            }
        }

        *owner = Some(me);
        Ok(())
    }

    fn post(&self) -> OsResult<()> {
        let (me, _) = thread_task();
        let mut owner = self.owner.lock();

        if *owner != Some(me) {
            return Err(OsError::MutexNotOwner);
        }
        *owner = None;
        drop(owner);

        self.released.notify_one();
        Ok(())
    }
}
