//! Synchronization layer
//!
//! Contains the registry guard and the instrumented mutex API.

pub mod guard;
pub mod mutex;
