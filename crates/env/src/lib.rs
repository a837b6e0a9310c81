//! Environment merging, publishing and the deploy environment resolver
//!
//! The crate ties the pipeline together: layers from `deployenv-config` are
//! merged per stage, handed to `deployenv-secrets` for resolution, and the
//! result is published to a deployment descriptor or a subprocess.

pub mod command;
pub mod merger;
pub mod plugin;
pub mod publisher;
pub mod variables;


pub use command::{run_with_environment, CommandOutput};
pub use merger::EnvironmentMerger;
pub use plugin::{backend_region, resolve_stage, DeployEnvironment, LifecyclePhase};
pub use publisher::{EnvironmentOverlay, EnvironmentPublisher};
pub use variables::{EnvSource, OptionSource, SecretSource, VariableSource, VariableSources};
