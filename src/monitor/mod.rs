//! Deadlock monitor task
//!
//! A low-priority task that wakes every poll interval, scans the registry
//! under the guard and resets the system on the first mutex held longer
//! than the stale timeout.
//!
//! Only hold time is observed. A task that is merely slow inside its
//! critical section is indistinguishable from a deadlocked one, so the
//! timeout has to exceed the longest legitimate hold.

pub mod recovery;

use portable_atomic::Ordering;

use crate::config::MONITOR_TASK_NAME;
use crate::core::detector::Detector;
use crate::core::registry::Registry;
use crate::error::{OsError, OsResult};
use crate::port::{Kernel, TaskSpec};
use crate::types::{LockId, OsTick, TaskId};

/// A mutex found held past the stale timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StaleHold {
    pub slot: usize,
    pub lock: LockId,
    pub name: Option<&'static str>,
    pub holder: TaskId,
    /// Ticks held at scan time
    pub held: OsTick,
}

/// First record, in registration order, held strictly longer than `threshold`
pub fn first_stale<const N: usize>(
    registry: &Registry<N>,
    now: OsTick,
    threshold: OsTick,
) -> Option<StaleHold> {
    registry.iter().enumerate().find_map(|(slot, rec)| {
        let holder = rec.holder?;
        let held = now.wrapping_sub(rec.acquired_at);
        (held > threshold).then_some(StaleHold {
            slot,
            lock: rec.lock,
            name: rec.name,
            holder,
            held,
        })
    })
}

impl<K: Kernel, const N: usize> Detector<K, N> {
    /// Create the monitor task
    ///
    /// Does nothing when detection is disabled in the configuration.
    pub fn start_monitor(&'static self) -> OsResult<()>
    where
        Self: Sync,
        K: 'static,
    {
        if !self.config.enabled {
            crate::info!("deadlock detection disabled, monitor not started");
            return Ok(());
        }

        if self
            .monitor_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OsError::MonitorRunning);
        }

        let spec = TaskSpec {
            name: MONITOR_TASK_NAME,
            prio: self.config.monitor_prio,
            stk_size: self.config.monitor_stk_size,
        };
        let arg = self as *const Self as *const ();

        // SAFETY: `self` is 'static and Sync.
        let created = unsafe { self.kernel.task_create(&spec, monitor_entry::<K, N>, arg) };
        if created.is_err() {
            self.monitor_started.store(false, Ordering::Release);
            return Err(OsError::TaskCreate);
        }

        crate::info!(
            "deadlock monitor started: timeout {} ticks, period {} ticks",
            self.config.stale_timeout,
            self.config.poll_interval
        );
        Ok(())
    }

    /// Run one scan
    ///
    /// Holds the guard for the whole scan. On a stale hold this does not
    /// return: the report is printed and the system is reset.
    pub fn poll(&self) -> OsResult<()> {
        let registry = self.registry.lock()?;
        let now = self.kernel.tick_get();

        if let Some(stale) = first_stale(&*registry, now, self.config.stale_timeout) {
            crate::error!(
                "stale mutex hold: slot {} held {} ticks",
                stale.slot,
                stale.held
            );
            self.recover(&*registry, now, Some(stale));
        }
        Ok(())
    }

    fn run_monitor(&self) -> ! {
        loop {
            self.kernel.time_dly(self.config.poll_interval);
            if self.poll().is_err() {
                crate::error!("registry guard unavailable, scan skipped");
            }
        }
    }
}

fn monitor_entry<K: Kernel, const N: usize>(arg: *const ()) -> ! {
    // SAFETY: `start_monitor` passes a &'static Detector<K, N>.
    let detector = unsafe { &*(arg as *const Detector<K, N>) };
    detector.run_monitor()
}
