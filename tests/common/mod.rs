//! Manual-tick kernel for deterministic detector tests
//!
//! Time only moves when a test says so, the calling task is whatever the
//! test last selected, and a system reset panics so it can be caught.

#![allow(dead_code)]

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use deadlock_guard::{
    opt, Console, Kernel, OsError, OsOpt, OsResult, OsTick, RawMutex, TaskEntry, TaskId,
    TaskSpec, WAIT_FOREVER,
};

pub const TASK1: TaskId = TaskId(1);
pub const TASK2: TaskId = TaskId(2);
pub const MONITOR: TaskId = TaskId(9);
pub const STRANGER: TaskId = TaskId(77);

pub const RESET_PANIC: &str = "system reset";

#[derive(Default)]
struct State {
    now: AtomicU32,
    current: AtomicU32,
    tick_rate_hz: AtomicU32,
    console: Mutex<String>,
    resets: AtomicU32,
    created: Mutex<Vec<TaskSpec>>,
    fail_mutex_create: AtomicBool,
    fail_task_create: AtomicBool,
    fail_pend: AtomicBool,
}

#[derive(Clone)]
pub struct ManualKernel {
    state: Arc<State>,
}

impl ManualKernel {
    pub fn new() -> Self {
        let kernel = Self {
            state: Arc::new(State::default()),
        };
        kernel.state.tick_rate_hz.store(1000, Ordering::SeqCst);
        kernel.run_as(TASK1);
        kernel
    }

    pub fn with_tick_rate(self, hz: u32) -> Self {
        self.state.tick_rate_hz.store(hz, Ordering::SeqCst);
        self
    }

    pub fn set_tick(&self, now: OsTick) {
        self.state.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, ticks: OsTick) {
        let now = self.state.now.load(Ordering::SeqCst);
        self.set_tick(now.wrapping_add(ticks));
    }

    pub fn run_as(&self, task: TaskId) {
        self.state.current.store(task.0, Ordering::SeqCst);
    }

    pub fn output(&self) -> String {
        self.state.console.lock().clone()
    }

    pub fn resets(&self) -> u32 {
        self.state.resets.load(Ordering::SeqCst)
    }

    pub fn created_tasks(&self) -> Vec<TaskSpec> {
        self.state.created.lock().clone()
    }

    pub fn fail_mutex_create(&self, fail: bool) {
        self.state.fail_mutex_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_task_create(&self, fail: bool) {
        self.state.fail_task_create.store(fail, Ordering::SeqCst);
    }

    /// Make every pend abort, the registry guard's included
    pub fn fail_pend(&self, fail: bool) {
        self.state.fail_pend.store(fail, Ordering::SeqCst);
    }

    fn current(&self) -> TaskId {
        TaskId(self.state.current.load(Ordering::SeqCst))
    }
}

/// Mutex that never blocks: contention is a timeout, or a test bug when
/// waiting forever
pub struct ManualMutex {
    owner: Mutex<Option<TaskId>>,
    kernel: ManualKernel,
}

impl ManualMutex {
    pub fn owner(&self) -> Option<TaskId> {
        *self.owner.lock()
    }
}

impl RawMutex for ManualMutex {
    fn pend(&self, timeout: OsTick, pend_opt: OsOpt) -> OsResult<()> {
        if self.kernel.state.fail_pend.load(Ordering::SeqCst) {
            return Err(OsError::PendAbort);
        }
        let me = self.kernel.current();
        let mut owner = self.owner.lock();
        match *owner {
            None => {
                *owner = Some(me);
                Ok(())
            }
            Some(holder) if holder == me => Err(OsError::MutexOwner),
            Some(_) if pend_opt & opt::PEND_NON_BLOCKING != 0 => Err(OsError::PendWouldBlock),
            Some(_) if timeout == WAIT_FOREVER => {
                panic!("pend would block forever in a single-threaded test")
            }
            Some(_) => {
                self.kernel.advance(timeout);
                Err(OsError::Timeout)
            }
        }
    }

    fn post(&self) -> OsResult<()> {
        let me = self.kernel.current();
        let mut owner = self.owner.lock();
        if *owner != Some(me) {
            return Err(OsError::MutexNotOwner);
        }
        *owner = None;
        Ok(())
    }
}

pub struct ManualConsole {
    kernel: ManualKernel,
}

impl fmt::Write for ManualConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.kernel.state.console.lock().push_str(s);
        Ok(())
    }
}

impl Console for ManualConsole {}

impl Kernel for ManualKernel {
    type Mutex = ManualMutex;
    type Console = ManualConsole;

    fn mutex_create(&self, _name: &'static str) -> OsResult<ManualMutex> {
        if self.state.fail_mutex_create.load(Ordering::SeqCst) {
            return Err(OsError::ObjCreate);
        }
        Ok(ManualMutex {
            owner: Mutex::new(None),
            kernel: self.clone(),
        })
    }

    unsafe fn task_create(
        &self,
        spec: &TaskSpec,
        _entry: TaskEntry,
        _arg: *const (),
    ) -> OsResult<TaskId> {
        if self.state.fail_task_create.load(Ordering::SeqCst) {
            return Err(OsError::TaskCreate);
        }
        self.state.created.lock().push(*spec);
        Ok(MONITOR)
    }

    fn task_current(&self) -> TaskId {
        self.current()
    }

    fn task_name(&self, task: TaskId) -> Option<&'static str> {
        match task {
            TASK1 => Some("Task1"),
            TASK2 => Some("Task2"),
            MONITOR => Some("DeadlockDet"),
            _ => None,
        }
    }

    fn tick_get(&self) -> OsTick {
        self.state.now.load(Ordering::SeqCst)
    }

    fn tick_rate_hz(&self) -> u32 {
        self.state.tick_rate_hz.load(Ordering::SeqCst)
    }

    fn time_dly(&self, ticks: OsTick) {
        self.advance(ticks);
    }

    fn console(&self) -> ManualConsole {
        ManualConsole {
            kernel: self.clone(),
        }
    }

    fn system_reset(&self) -> ! {
        self.state.resets.fetch_add(1, Ordering::SeqCst);
        panic!("{}", RESET_PANIC)
    }
}

/// Run `f` and report whether it ended in a system reset
pub fn resets_system(f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => false,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("");
            assert_eq!(msg, RESET_PANIC, "unexpected panic: {msg}");
            true
        }
    }
}
