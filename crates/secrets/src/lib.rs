//! Secret resolution for deployenv
//!
//! Values of the form `<prefix>:<name>` are secret references. The
//! [`SecretResolver`] validates them, fetches each distinct name once through
//! a [`SecretBackend`], and produces a [`ResolvedEnvironment`] only when every
//! reference resolved.

mod backend;
mod resolver;


pub use backend::{CommandBackend, SecretBackend, StaticBackend};
pub use resolver::{ResolvedEnvironment, SecretResolver};
