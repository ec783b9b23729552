//! Compile-time and startup configuration for the deadlock guard
//!
//! The `CFG_*` constants are the defaults; [`DetectorConfig`] lets the
//! application override them once, before the detector is initialized.

use crate::error::{OsError, OsResult};
use crate::types::{OsPrio, OsTick};

/// Enable the monitor task
pub const CFG_DEADLOCK_DETECTION_EN: bool = true;

/// Hold time (ticks) after which a mutex is considered stale
pub const CFG_DEADLOCK_TIMEOUT: OsTick = 5000;

/// Number of mutexes the registry can track
pub const CFG_MAX_MUTEX_TRACKING: usize = 10;

/// Monitor polling period in ticks
pub const CFG_MONITOR_PERIOD: OsTick = 1000;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Maximum number of priority levels
pub const CFG_PRIO_MAX: usize = 64;

/// Idle task priority
pub const CFG_PRIO_IDLE: OsPrio = (CFG_PRIO_MAX - 1) as OsPrio;

/// Monitor priority, one level above idle
pub const CFG_MONITOR_PRIO: OsPrio = CFG_PRIO_IDLE - 1;

/// Minimum task stack size
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Monitor task stack size in words
pub const CFG_MONITOR_STK_SIZE: usize = 256;

/// Name the monitor task is created with
pub const MONITOR_TASK_NAME: &str = "DeadlockDet";

/// Startup-time detector settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorConfig {
    /// Whether `start_monitor` actually creates the monitor task
    pub enabled: bool,
    /// Stale-hold threshold in ticks; a hold is stale when strictly longer
    pub stale_timeout: OsTick,
    /// Monitor sleep between two scans, in ticks
    pub poll_interval: OsTick,
    pub monitor_prio: OsPrio,
    pub monitor_stk_size: usize,
}

impl DetectorConfig {
    pub const fn new() -> Self {
        Self {
            enabled: CFG_DEADLOCK_DETECTION_EN,
            stale_timeout: CFG_DEADLOCK_TIMEOUT,
            poll_interval: CFG_MONITOR_PERIOD,
            monitor_prio: CFG_MONITOR_PRIO,
            monitor_stk_size: CFG_MONITOR_STK_SIZE,
        }
    }

    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub const fn stale_timeout(mut self, ticks: OsTick) -> Self {
        self.stale_timeout = ticks;
        self
    }

    pub const fn poll_interval(mut self, ticks: OsTick) -> Self {
        self.poll_interval = ticks;
        self
    }

    pub const fn monitor_prio(mut self, prio: OsPrio) -> Self {
        self.monitor_prio = prio;
        self
    }

    pub const fn monitor_stk_size(mut self, words: usize) -> Self {
        self.monitor_stk_size = words;
        self
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> OsResult<()> {
        if self.poll_interval == 0 {
            return Err(OsError::OptInvalid);
        }
        if self.monitor_stk_size < CFG_STK_SIZE_MIN {
            return Err(OsError::OptInvalid);
        }
        if self.monitor_prio as usize >= CFG_PRIO_MAX {
            return Err(OsError::OptInvalid);
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}
