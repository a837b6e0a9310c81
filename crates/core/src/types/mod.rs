//! Core domain types for `deployenv`.
//!
//! - **`environment`**: flat and scoped environment mappings, stage names
//! - **`security`**: secret reference syntax and validation
//! - **`state_machines`**: resolution pass lifecycle

pub mod environment;
pub mod security;
pub mod state_machines;

pub use environment::*;
pub use security::*;
pub use state_machines::*;
