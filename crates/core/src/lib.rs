//! Core domain types, errors, and constants for `deployenv`.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias shared by every
//!   crate in the workspace.
//! - **`types`**: environment mappings, stage names, secret reference syntax
//!   and the resolution pass state machine.
//! - **`constants`**: shared names such as the default reference prefix.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, IoResultExt, Result, ResultExt},
    types::*,
};
