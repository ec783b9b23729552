//! Cortex-M4 port helpers
//!
//! Building blocks for hosts implementing [`Kernel`](crate::port::Kernel) on
//! Cortex-M: a semihosting console for diagnostic reports and the SCB
//! system reset used as the recovery action.

use core::fmt;

use cortex_m::peripheral::SCB;
use cortex_m_semihosting::hio::{self, HostStream};

use crate::port::Console;

/// Request a system reset through the SCB
///
/// Waits for pending memory accesses, then sets SYSRESETREQ.
#[inline]
pub fn system_reset() -> ! {
    SCB::sys_reset()
}

/// Diagnostic console over the debugger's semihosting stdout
///
/// Output is dropped when no debugger is attached.
pub struct SemihostingConsole {
    stream: Option<HostStream>,
}

impl SemihostingConsole {
    pub fn open() -> Self {
        Self {
            stream: hio::hstdout().ok(),
        }
    }
}

impl fmt::Write for SemihostingConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.stream.as_mut() {
            Some(stream) => fmt::Write::write_str(stream, s),
            None => Ok(()),
        }
    }
}

impl Console for SemihostingConsole {}
