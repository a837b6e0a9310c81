//! Configuration loading for deployenv
//!
//! This crate reads the deployment descriptor, the raw layered environment
//! configuration, and the options that steer a resolver instance.

pub mod descriptor;
pub mod format;
pub mod loader;
pub mod options;
pub mod raw;

#[cfg(test)]
mod loader_tests;

pub use descriptor::*;
pub use format::*;
pub use loader::*;
pub use options::*;
pub use raw::*;
