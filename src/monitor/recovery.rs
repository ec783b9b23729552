//! Diagnostic report and system reset
//!
//! Recovery is all-or-nothing: print what is held by whom, flush the
//! console, reset. No mutex is force-released and no task is killed
//! on its own.

use core::fmt::{self, Write};

use crate::core::detector::Detector;
use crate::core::registry::Registry;
use crate::monitor::StaleHold;
use crate::port::{Console, Kernel};
use crate::types::{OsTick, TaskId};

const UNNAMED_MUTEX: &str = "<unnamed>";
const UNKNOWN_TASK: &str = "<unknown>";

/// Distinct tasks holding at least one tracked mutex, in first-seen order
pub struct ImplicatedTasks<const N: usize> {
    tasks: [Option<TaskId>; N],
    len: usize,
}

impl<const N: usize> ImplicatedTasks<N> {
    pub fn collect(registry: &Registry<N>) -> Self {
        let mut set = Self {
            tasks: [None; N],
            len: 0,
        };
        for holder in registry.held().filter_map(|rec| rec.holder) {
            set.insert(holder);
        }
        set
    }

    fn insert(&mut self, task: TaskId) {
        if self.iter().any(|t| t == task) || self.len == N {
            return;
        }
        self.tasks[self.len] = Some(task);
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks[..self.len].iter().flatten().copied()
    }
}

/// Deadlock report over a registry snapshot
///
/// Rendered with `Display`; the registry must stay locked while it is
/// written so the report is consistent.
pub struct Report<'a, K: Kernel, const N: usize> {
    pub kernel: &'a K,
    pub registry: &'a Registry<N>,
    pub now: OsTick,
    /// Task that ran the detection
    pub invoker: TaskId,
    /// Stale hold that triggered the report, when raised by the monitor
    pub trigger: Option<StaleHold>,
    /// Stale timeout in ticks
    pub threshold: OsTick,
}

impl<K: Kernel, const N: usize> Report<'_, K, N> {
    fn task_label(&self, task: TaskId) -> &'static str {
        self.kernel.task_name(task).unwrap_or(UNKNOWN_TASK)
    }

    fn held_ms(&self, acquired_at: OsTick) -> u32 {
        self.kernel.ticks_to_ms(self.now.wrapping_sub(acquired_at))
    }

    fn write_held_by(&self, f: &mut fmt::Formatter<'_>, task: TaskId) -> fmt::Result {
        writeln!(f, "Task {} holds:", self.task_label(task))?;

        let mut count = 0usize;
        for rec in self.registry.held_by(task) {
            writeln!(
                f,
                "  - {} (held {} ms)",
                rec.name.unwrap_or(UNNAMED_MUTEX),
                self.held_ms(rec.acquired_at)
            )?;
            count += 1;
        }
        if count == 0 {
            writeln!(f, "  holds no mutexes")?;
        }
        Ok(())
    }
}

impl<K: Kernel, const N: usize> fmt::Display for Report<'_, K, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let invoker = self.task_label(self.invoker);

        if let Some(stale) = self.trigger {
            writeln!(
                f,
                "Deadlock detection: mutex {} held by task {} for {} ms (limit {} ms), detected by task {}",
                stale.name.unwrap_or(UNNAMED_MUTEX),
                self.task_label(stale.holder),
                self.kernel.ticks_to_ms(stale.held),
                self.kernel.ticks_to_ms(self.threshold),
                invoker
            )?;
            self.write_held_by(f, stale.holder)?;
        }

        writeln!(f, "Deadlock detected! Resetting system... (triggered by task {invoker})")?;

        writeln!(f, "Held mutexes:")?;
        for rec in self.registry.held() {
            if let Some(holder) = rec.holder {
                writeln!(
                    f,
                    "  {} held by task {} ({} ms)",
                    rec.name.unwrap_or(UNNAMED_MUTEX),
                    self.task_label(holder),
                    self.held_ms(rec.acquired_at)
                )?;
            }
        }

        writeln!(f, "Mutexes held by implicated tasks:")?;
        for task in ImplicatedTasks::collect(self.registry).iter() {
            self.write_held_by(f, task)?;
        }
        Ok(())
    }
}

impl<K: Kernel, const N: usize> Detector<K, N> {
    /// Print the deadlock report and reset
    ///
    /// Callable by any detector; takes the registry guard itself. If the
    /// guard cannot be taken the report is reduced to its header, and the
    /// system is reset regardless.
    pub fn reset_system(&self) -> ! {
        match self.registry.lock() {
            Ok(registry) => {
                let now = self.kernel.tick_get();
                self.recover(&registry, now, None)
            }
            Err(_err) => {
                crate::error!("registry guard unavailable, resetting without report");
                let invoker = self.kernel.task_current();
                let mut console = self.kernel.console();
                let _ = writeln!(
                    console,
                    "Deadlock detected! Resetting system... (triggered by task {})",
                    self.kernel.task_name(invoker).unwrap_or(UNKNOWN_TASK)
                );
                self.finish_reset(console)
            }
        }
    }

    /// Report and reset with the registry guard already held
    pub(crate) fn recover(
        &self,
        registry: &Registry<N>,
        now: OsTick,
        trigger: Option<StaleHold>,
    ) -> ! {
        let report = Report {
            kernel: &self.kernel,
            registry,
            now,
            invoker: self.kernel.task_current(),
            trigger,
            threshold: self.config.stale_timeout,
        };

        let mut console = self.kernel.console();
        // A console error must not stop the reset.
        let _ = write!(console, "{report}");
        self.finish_reset(console)
    }

    fn finish_reset(&self, mut console: K::Console) -> ! {
        let _ = writeln!(console, "System reset.");
        console.flush();
        self.kernel.system_reset()
    }
}
