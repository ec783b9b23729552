//! Hosted simulation port
//!
//! Runs the detector on a desktop OS the way an RTOS simulator would:
//! - tasks are named OS threads, priorities and stack sizes are ignored
//! - the tick counter is derived from a monotonic clock
//! - mutexes are non-recursive and track their owning task
//! - a system reset flushes stdout and exits the process
//!
//! Threads not created through the port are adopted as tasks named
//! `"host"` the first time they ask for their identity. Spawned tasks leave
//! the task table when their thread ends; adopted threads stay in it for
//! the life of the kernel.

mod mutex;

pub use mutex::SimMutex;

use core::fmt;
use std::cell::Cell;
use std::io::Write as _;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use portable_atomic::{AtomicU32, Ordering};

use crate::config::CFG_TICK_RATE_HZ;
use crate::error::{OsError, OsResult};
use crate::port::{Console, Kernel, TaskEntry, TaskSpec};
use crate::types::{OsTick, TaskId};

/// Name given to adopted threads
pub const HOST_TASK_NAME: &str = "host";

static NEXT_TASK: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static CURRENT: Cell<Option<(TaskId, &'static str)>> = const { Cell::new(None) };
}

/// Task identity of the calling thread, adopting it if needed
pub(crate) fn thread_task() -> (TaskId, &'static str) {
    CURRENT.with(|cur| match cur.get() {
        Some(task) => task,
        None => {
            let task = (alloc_task_id(), HOST_TASK_NAME);
            cur.set(Some(task));
            task
        }
    })
}

fn alloc_task_id() -> TaskId {
    TaskId(NEXT_TASK.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn ticks_to_duration(ticks: OsTick, tick_rate_hz: u32) -> Duration {
    let hz = u64::from(tick_rate_hz.max(1));
    Duration::from_micros(u64::from(ticks) * 1_000_000 / hz)
}

type ResetHook = Box<dyn Fn() + Send + Sync>;

struct SimShared {
    epoch: Instant,
    tick_rate_hz: u32,
    tasks: Mutex<Vec<(TaskId, &'static str)>>,
    capture: Option<Arc<Mutex<String>>>,
    on_reset: Option<ResetHook>,
}

/// Simulated kernel; clones share the same clock, tasks and console
#[derive(Clone)]
pub struct SimKernel {
    shared: Arc<SimShared>,
}

/// Builder for [`SimKernel`]
pub struct SimKernelBuilder {
    tick_rate_hz: u32,
    capture: Option<Arc<Mutex<String>>>,
    on_reset: Option<ResetHook>,
}

impl SimKernelBuilder {
    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Write console output into `buf` instead of stdout
    pub fn capture_console(mut self, buf: Arc<Mutex<String>>) -> Self {
        self.capture = Some(buf);
        self
    }

    /// Replace the process exit on reset
    ///
    /// The hook runs on the resetting task, which is then halted forever
    /// instead of exiting the process.
    pub fn on_reset(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reset = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> OsResult<SimKernel> {
        if self.tick_rate_hz == 0 {
            return Err(OsError::OptInvalid);
        }
        Ok(SimKernel::from_builder(self))
    }
}

impl SimKernel {
    pub fn builder() -> SimKernelBuilder {
        SimKernelBuilder {
            tick_rate_hz: CFG_TICK_RATE_HZ,
            capture: None,
            on_reset: None,
        }
    }

    /// Kernel with the default tick rate, printing to stdout
    pub fn new() -> Self {
        Self::from_builder(Self::builder())
    }

    fn from_builder(builder: SimKernelBuilder) -> Self {
        Self {
            shared: Arc::new(SimShared {
                epoch: Instant::now(),
                tick_rate_hz: builder.tick_rate_hz,
                tasks: Mutex::new(Vec::new()),
                capture: builder.capture,
                on_reset: builder.on_reset,
            }),
        }
    }

    /// Start a named task running `f`
    pub fn spawn<F>(&self, name: &'static str, f: F) -> OsResult<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = alloc_task_id();
        self.record_task(id, name);

        let exit = TaskExit {
            shared: self.shared.clone(),
            id,
        };
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _exit = exit;
                CURRENT.with(|cur| cur.set(Some((id, name))));
                f();
            })
            .map_err(|_| OsError::TaskCreate)?;

        crate::debug!("sim task {} started as {}", name, id.0);
        Ok(id)
    }

    /// Delay the calling thread by `ms` milliseconds of simulated time
    pub fn delay_ms(&self, ms: u32) {
        self.time_dly(self.ms_to_ticks(ms));
    }

    fn record_task(&self, id: TaskId, name: &'static str) {
        let mut tasks = self.shared.tasks.lock();
        if !tasks.iter().any(|(known, _)| *known == id) {
            tasks.push((id, name));
        }
    }
}

/// Drops a spawned task from the task table when its thread ends
struct TaskExit {
    shared: Arc<SimShared>,
    id: TaskId,
}

impl Drop for TaskExit {
    fn drop(&mut self) {
        self.shared.tasks.lock().retain(|(known, _)| *known != self.id);
    }
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

struct TaskArg(*const ());

// The caller of `task_create` guarantees the pointee may be used from the
// new task.
unsafe impl Send for TaskArg {}

impl Kernel for SimKernel {
    type Mutex = SimMutex;
    type Console = SimConsole;

    fn mutex_create(&self, name: &'static str) -> OsResult<SimMutex> {
        Ok(SimMutex::new(name, self.shared.tick_rate_hz))
    }

    unsafe fn task_create(
        &self,
        spec: &TaskSpec,
        entry: TaskEntry,
        arg: *const (),
    ) -> OsResult<TaskId> {
        let arg = TaskArg(arg);
        self.spawn(spec.name, move || {
            let arg = arg;
            entry(arg.0);
        })
    }

    fn task_current(&self) -> TaskId {
        let (id, name) = thread_task();
        self.record_task(id, name);
        id
    }

    fn task_name(&self, task: TaskId) -> Option<&'static str> {
        self.shared
            .tasks
            .lock()
            .iter()
            .find(|(id, _)| *id == task)
            .map(|(_, name)| *name)
    }

    fn tick_get(&self) -> OsTick {
        let micros = self.shared.epoch.elapsed().as_micros();
        // Truncation wraps like a hardware tick counter.
        (micros * u128::from(self.shared.tick_rate_hz) / 1_000_000) as OsTick
    }

    fn tick_rate_hz(&self) -> u32 {
        self.shared.tick_rate_hz
    }

    fn time_dly(&self, ticks: OsTick) {
        if ticks > 0 {
            thread::sleep(ticks_to_duration(ticks, self.shared.tick_rate_hz));
        }
    }

    fn console(&self) -> SimConsole {
        SimConsole {
            capture: self.shared.capture.clone(),
        }
    }

    fn system_reset(&self) -> ! {
        match &self.shared.on_reset {
            Some(hook) => {
                hook();
                crate::warn!("simulated reset, halting task");
                loop {
                    thread::park();
                }
            }
            None => {
                let _ = std::io::stdout().flush();
                std::process::exit(0)
            }
        }
    }
}

/// Console writing to stdout or to a capture buffer
pub struct SimConsole {
    capture: Option<Arc<Mutex<String>>>,
}

impl fmt::Write for SimConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match &self.capture {
            Some(buf) => {
                buf.lock().push_str(s);
                Ok(())
            }
            None => std::io::stdout()
                .write_all(s.as_bytes())
                .map_err(|_| fmt::Error),
        }
    }
}

impl Console for SimConsole {
    fn flush(&mut self) {
        if self.capture.is_none() {
            let _ = std::io::stdout().flush();
        }
    }
}
