//! Logging macros for the deadlock guard
//!
//! Routes to `defmt` on target builds, to `tracing` on hosted builds,
//! and compiles to nothing when neither backend is enabled.

/// Debug message
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

/// Info message
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

/// Error message
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

/// Trace message
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

/// Warning message
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

// Hosted builds log through tracing
#[cfg(all(feature = "std", not(feature = "defmt")))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__tracing::debug!(target: "deadlock_guard", $($arg)*) };
}
#[cfg(all(feature = "std", not(feature = "defmt")))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__tracing::info!(target: "deadlock_guard", $($arg)*) };
}
#[cfg(all(feature = "std", not(feature = "defmt")))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__tracing::error!(target: "deadlock_guard", $($arg)*) };
}
#[cfg(all(feature = "std", not(feature = "defmt")))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__tracing::trace!(target: "deadlock_guard", $($arg)*) };
}
#[cfg(all(feature = "std", not(feature = "defmt")))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__tracing::warn!(target: "deadlock_guard", $($arg)*) };
}

// No-op versions when no backend is enabled
#[cfg(not(any(feature = "defmt", feature = "std")))]
#[macro_export]
macro_rules! debug { ($($arg:tt)*) => {}; }
#[cfg(not(any(feature = "defmt", feature = "std")))]
#[macro_export]
macro_rules! info { ($($arg:tt)*) => {}; }
#[cfg(not(any(feature = "defmt", feature = "std")))]
#[macro_export]
macro_rules! error { ($($arg:tt)*) => {}; }
#[cfg(not(any(feature = "defmt", feature = "std")))]
#[macro_export]
macro_rules! trace { ($($arg:tt)*) => {}; }
#[cfg(not(any(feature = "defmt", feature = "std")))]
#[macro_export]
macro_rules! warn { ($($arg:tt)*) => {}; }
