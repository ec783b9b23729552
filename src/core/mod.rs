//! Core guard modules
//!
//! Contains configuration, error types, the mutex registry and the detector
//! context.

pub mod config;
pub mod detector;
pub mod error;
pub mod registry;
pub mod types;
