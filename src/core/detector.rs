//! Detector context
//!
//! One [`Detector`] owns the registry, its guard and the configuration. It
//! is created once before any application task starts and lives until the
//! system resets; every instrumented call and the monitor task go through it.

use portable_atomic::{AtomicBool, Ordering};

use crate::config::{DetectorConfig, CFG_MAX_MUTEX_TRACKING};
use crate::core::registry::Registry;
use crate::error::{OsError, OsResult};
use crate::port::Kernel;
use crate::sync::guard::{GuardRef, RegistryGuard};

/// Name of the host mutex serializing registry access
pub(crate) const GUARD_MUTEX_NAME: &str = "DeadlockRegistry";

/// Deadlock detector state
pub struct Detector<K: Kernel, const N: usize = CFG_MAX_MUTEX_TRACKING> {
    pub(crate) kernel: K,
    pub(crate) config: DetectorConfig,
    pub(crate) registry: RegistryGuard<K::Mutex, Registry<N>>,
    pub(crate) monitor_started: AtomicBool,
}

impl<K: Kernel, const N: usize> Detector<K, N> {
    /// Initialize the detector
    ///
    /// Creates the registry guard mutex on the host. The monitor is started
    /// separately with [`start_monitor`](Self::start_monitor).
    pub fn init(kernel: K, config: DetectorConfig) -> OsResult<Self> {
        config.validate()?;

        let raw = kernel
            .mutex_create(GUARD_MUTEX_NAME)
            .map_err(|_| OsError::ObjCreate)?;

        crate::debug!("deadlock detector initialized, capacity {}", N);

        Ok(Self {
            kernel,
            config,
            registry: RegistryGuard::new(raw, Registry::new()),
            monitor_started: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    #[inline]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Whether the monitor task has been created
    #[inline]
    pub fn is_monitoring(&self) -> bool {
        self.monitor_started.load(Ordering::Acquire)
    }

    /// Run `f` on a consistent view of the registry
    pub fn inspect<R>(&self, f: impl FnOnce(&Registry<N>) -> R) -> OsResult<R> {
        self.registry.with(|registry| f(registry))
    }

    /// Take the guard for a bookkeeping update
    ///
    /// A guard failure is logged and reported as `None`; the caller then
    /// skips the update.
    pub(crate) fn lock_registry(&self) -> Option<GuardRef<'_, K::Mutex, Registry<N>>> {
        match self.registry.lock() {
            Ok(held) => Some(held),
            Err(_err) => {
                crate::error!("registry guard unavailable, bookkeeping skipped");
                None
            }
        }
    }
}
