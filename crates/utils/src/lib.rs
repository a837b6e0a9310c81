//! Shared utilities for deployenv
//!
//! The sync-over-async bridge used during initialization and the tracing
//! subscriber setup shared by binaries.

pub mod async_runtime;
pub mod tracing;

pub use async_runtime::*;
