//! Error types for the deadlock guard
//!
//! Uses Rust's Result pattern instead of C-style status codes. The numeric
//! values follow the μC/OS-III error numbering so they can be matched
//! against host kernel logs.

use core::fmt;

/// Guard and port error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Mutex errors ============
    /// Caller is not the mutex owner
    MutexNotOwner = 22401,
    /// Task already owns the mutex
    MutexOwner = 22402,

    // ============ Object errors ============
    /// The host could not create the kernel object
    ObjCreate = 24005,

    // ============ Option errors ============
    /// Invalid configuration value
    OptInvalid = 24101,

    // ============ OS state errors ============
    /// OS is not running
    OsNotRunning = 24201,
    /// The monitor task was already started
    MonitorRunning = 24205,

    // ============ Pend errors ============
    /// Pend was aborted
    PendAbort = 25001,
    /// Non-blocking pend found the mutex taken
    PendWouldBlock = 25008,

    // ============ Task errors ============
    /// The host could not create a task
    TaskCreate = 29002,

    // ============ Timeout ============
    /// Operation timed out
    Timeout = 29401,
}

/// Result type alias for guard operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Numeric μC/OS-style error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OsError::MutexNotOwner => "caller does not own the mutex",
            OsError::MutexOwner => "caller already owns the mutex",
            OsError::ObjCreate => "kernel object creation failed",
            OsError::OptInvalid => "invalid option",
            OsError::OsNotRunning => "os is not running",
            OsError::MonitorRunning => "deadlock monitor already started",
            OsError::PendAbort => "pend aborted",
            OsError::PendWouldBlock => "pend would block",
            OsError::TaskCreate => "task creation failed",
            OsError::Timeout => "timed out",
        };
        write!(f, "{msg} ({})", self.code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OsError {}
