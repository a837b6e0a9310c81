//! The deploy environment resolver
//!
//! One [`DeployEnvironment`] per process: it selects the stage, loads the raw
//! layers once, runs one resolution pass at initialization and caches the
//! result. Lifecycle hooks publish the cached environment; the ad-hoc command
//! recomputes when asked for a different stage and leaves the cache alone.

use crate::command::{self, CommandOutput};
use crate::merger::EnvironmentMerger;
use crate::publisher::{EnvironmentOverlay, EnvironmentPublisher};
use crate::variables::{SecretSource, VariableSources};
use deployenv_config::{ConfigLoader, DeploymentDescriptor, LoadedConfig, PluginOptions, RunOptions};
use deployenv_core::{Error, ReferenceSyntax, Result, StageName};
use deployenv_secrets::{ResolvedEnvironment, SecretBackend, SecretResolver};
use deployenv_utils::tracing::pass_span;
use deployenv_utils::SyncBridge;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Instrument;

/// Host lifecycle phases the resolver hooks into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    CreateDeploymentArtifacts,
    OfflineStartInit,
    WebpackInvoke,
    RunWithEnvironment,
}

impl LifecyclePhase {
    pub const ALL: [LifecyclePhase; 4] = [
        LifecyclePhase::CreateDeploymentArtifacts,
        LifecyclePhase::OfflineStartInit,
        LifecyclePhase::WebpackInvoke,
        LifecyclePhase::RunWithEnvironment,
    ];

    #[must_use]
    pub fn hook_name(self) -> &'static str {
        match self {
            LifecyclePhase::CreateDeploymentArtifacts => "before:deploy:createDeploymentArtifacts",
            LifecyclePhase::OfflineStartInit => "before:offline:start:init",
            LifecyclePhase::WebpackInvoke => "before:webpack:invoke:invoke",
            LifecyclePhase::RunWithEnvironment => "runWithEnvironment:run",
        }
    }

    /// Whether the phase writes the environment into the descriptor
    #[must_use]
    pub fn publishes(self) -> bool {
        !matches!(self, LifecyclePhase::RunWithEnvironment)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hook_name())
    }
}

impl FromStr for LifecyclePhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LifecyclePhase::ALL
            .into_iter()
            .find(|phase| phase.hook_name() == s)
            .ok_or_else(|| {
                Error::configuration(format!("unknown lifecycle phase '{s}'"))
            })
    }
}

#[derive(Debug, Clone)]
struct ResolvedState {
    environment: ResolvedEnvironment,
    variables: ResolvedEnvironment,
}

/// Stage-aware environment resolver bound to one descriptor
pub struct DeployEnvironment {
    options: PluginOptions,
    stage: StageName,
    config: LoadedConfig,
    merger: EnvironmentMerger,
    resolver: Arc<SecretResolver>,
    publisher: EnvironmentPublisher,
    state: Option<ResolvedState>,
}

impl DeployEnvironment {
    /// Load layers for `descriptor` and prepare a resolver; nothing is fetched yet.
    ///
    /// A relative `custom.deploy.file` is read from the working directory; use
    /// [`with_base_dir`](Self::with_base_dir) when the descriptor lives elsewhere.
    pub fn new(
        descriptor: &DeploymentDescriptor,
        options: PluginOptions,
        backend: Arc<dyn SecretBackend>,
    ) -> Result<Self> {
        Self::with_base_dir(descriptor, options, backend, Path::new("."))
    }

    /// Like [`new`](Self::new), resolving relative config files against `base_dir`
    pub fn with_base_dir(
        descriptor: &DeploymentDescriptor,
        options: PluginOptions,
        backend: Arc<dyn SecretBackend>,
        base_dir: &Path,
    ) -> Result<Self> {
        let config = ConfigLoader::new()
            .base_dir(base_dir)
            .file(options.config_file.clone())
            .load(descriptor)?;
        Self::from_config(descriptor, options, backend, config)
    }

    /// Prepare a resolver over already loaded layers
    pub fn from_config(
        descriptor: &DeploymentDescriptor,
        options: PluginOptions,
        backend: Arc<dyn SecretBackend>,
        config: LoadedConfig,
    ) -> Result<Self> {
        let stage = resolve_stage(&options, descriptor)?;
        tracing::debug!(stage = %stage, "Getting deploy variables for stage {stage}");

        let syntax = ReferenceSyntax::new(&options.reference_prefix)?;
        let resolver = SecretResolver::new(backend, syntax, options.secrets)
            .with_max_concurrent(options.max_concurrent)
            .with_timeout(options.timeout);

        let prefix = options.prefix.clone().or_else(|| config.prefix.clone());
        let merger = EnvironmentMerger::new().with_prefix(prefix);
        let publisher = EnvironmentPublisher::new(options.deploy_scopes.clone());

        Ok(Self {
            options,
            stage,
            config,
            merger,
            resolver: Arc::new(resolver),
            publisher,
            state: None,
        })
    }

    #[must_use]
    pub fn stage(&self) -> &StageName {
        &self.stage
    }

    #[must_use]
    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    #[must_use]
    pub fn config(&self) -> &LoadedConfig {
        &self.config
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Run the initialization pass for the active stage. Later calls are no-ops.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let state = self.compute(&self.stage).await?;
        tracing::info!(
            stage = %self.stage,
            environment = state.environment.len(),
            variables = state.variables.len(),
            "deploy environment resolved"
        );
        self.state = Some(state);
        Ok(())
    }

    /// [`initialize`](Self::initialize) for synchronous callers
    pub fn initialize_blocking(&mut self) -> Result<()> {
        let mut bridge = SyncBridge::new().with_timeout(self.options.timeout);
        bridge.block_on("deploy environment initialization", self.initialize())
    }

    async fn compute(&self, stage: &StageName) -> Result<ResolvedState> {
        let span = pass_span(stage.as_str(), "deploy");
        async {
            let variables = EnvironmentMerger::new().merge_stage(&self.config.variables, stage.as_str());

            let (environment, variables) = futures::try_join!(
                self.compute_environment(stage),
                self.resolver.resolve(&variables)
            )?;
            Ok(ResolvedState {
                environment,
                variables,
            })
        }
        .instrument(span)
        .await
    }

    async fn compute_environment(&self, stage: &StageName) -> Result<ResolvedEnvironment> {
        let environment = self.merger.merge_stage(&self.config.environments, stage.as_str());
        self.resolver.resolve(&environment).await
    }

    fn state(&self) -> Result<&ResolvedState> {
        self.state.as_ref().ok_or_else(|| {
            Error::configuration("deploy environment has not been initialized")
        })
    }

    /// The cached environment of the active stage
    pub fn environment(&self) -> Result<&ResolvedEnvironment> {
        Ok(&self.state()?.environment)
    }

    /// The cached deploy variables of the active stage
    pub fn variables(&self) -> Result<&ResolvedEnvironment> {
        Ok(&self.state()?.variables)
    }

    /// Resolve the environment of `stage` without touching the cache.
    /// Deploy variables are not resolved.
    pub async fn environment_for(&self, stage: &StageName) -> Result<ResolvedEnvironment> {
        if stage == &self.stage {
            if let Some(state) = &self.state {
                return Ok(state.environment.clone());
            }
        }
        let span = pass_span(stage.as_str(), "run");
        self.compute_environment(stage).instrument(span).await
    }

    /// Extend the descriptor's runtime environment and deploy variables
    pub fn add_deploy_environment(&self, descriptor: &mut DeploymentDescriptor) -> Result<()> {
        let state = self.state()?;
        self.publisher
            .publish_to_descriptor(&state.environment, descriptor);
        self.publisher.publish_variables(&state.variables, descriptor);
        Ok(())
    }

    /// Hooks this resolver answers, in registration order
    #[must_use]
    pub fn hooks(&self) -> &'static [LifecyclePhase] {
        &LifecyclePhase::ALL
    }

    /// Dispatch a lifecycle hook
    pub async fn handle_hook(
        &self,
        phase: LifecyclePhase,
        descriptor: &mut DeploymentDescriptor,
    ) -> Result<Option<CommandOutput>> {
        tracing::debug!(phase = %phase, "handling lifecycle hook");
        if phase.publishes() {
            self.add_deploy_environment(descriptor)?;
            Ok(None)
        } else {
            self.run_with_environment(&self.options.run).await.map(Some)
        }
    }

    /// Run `run.command` with the resolved environment layered over the parent's
    pub async fn run_with_environment(&self, run: &RunOptions) -> Result<CommandOutput> {
        let command = run
            .command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration("runWithEnvironment requires a command (--command / -c)")
            })?;

        let stage = run
            .stage
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(StageName::from)
            .unwrap_or_else(|| self.stage.clone());

        let environment = self.environment_for(&stage).await?;
        let overlay = EnvironmentOverlay::from_resolved(&environment, self.options.inherit_env);
        command::run_with_environment(command, &run.args, &overlay).await
    }

    /// Register the secret source for this resolver's reference prefix
    pub fn register_variable_sources(&self, sources: &mut VariableSources) {
        sources.register(Arc::new(SecretSource::new(Arc::clone(&self.resolver))));
    }
}

/// Stage from the options, then `custom.defaults.stage`, then `provider.stage`
pub fn resolve_stage(options: &PluginOptions, descriptor: &DeploymentDescriptor) -> Result<StageName> {
    [
        options.stage.as_deref(),
        descriptor.default_stage(),
        descriptor.provider.stage.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.is_empty())
    .map(StageName::from)
    .ok_or_else(|| {
        Error::missing_stage("set the stage option, custom.defaults.stage or provider.stage")
    })
}

/// Backend region from the options, then `provider.region`
#[must_use]
pub fn backend_region(options: &PluginOptions, descriptor: &DeploymentDescriptor) -> Option<String> {
    options
        .region
        .clone()
        .or_else(|| descriptor.provider.region.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        for phase in LifecyclePhase::ALL {
            assert_eq!(phase.hook_name().parse::<LifecyclePhase>().unwrap(), phase);
        }
        assert!(!LifecyclePhase::RunWithEnvironment.publishes());
        assert!(LifecyclePhase::WebpackInvoke.publishes());

        let err = "after:deploy:deploy".parse::<LifecyclePhase>().unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_stage_fallbacks() {
        let mut descriptor = DeploymentDescriptor::default();
        let options = PluginOptions::default();
        assert!(matches!(
            resolve_stage(&options, &descriptor),
            Err(Error::MissingStage { .. })
        ));

        descriptor.provider.stage = Some("provider".into());
        assert_eq!(resolve_stage(&options, &descriptor).unwrap().as_str(), "provider");

        descriptor.custom = Some(serde_json::json!({"defaults": {"stage": "custom"}}));
        assert_eq!(resolve_stage(&options, &descriptor).unwrap().as_str(), "custom");

        let options = options.with_stage("explicit");
        assert_eq!(resolve_stage(&options, &descriptor).unwrap().as_str(), "explicit");
    }

    #[test]
    fn test_backend_region() {
        let mut descriptor = DeploymentDescriptor::default();
        assert!(backend_region(&PluginOptions::default(), &descriptor).is_none());

        descriptor.provider.region = Some("us-east-1".into());
        assert_eq!(
            backend_region(&PluginOptions::default(), &descriptor).as_deref(),
            Some("us-east-1")
        );
        assert_eq!(
            backend_region(&PluginOptions::default().with_region("eu-west-1"), &descriptor)
                .as_deref(),
            Some("eu-west-1")
        );
    }
}
