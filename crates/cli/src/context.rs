use clap::Args;
use deployenv_config::{DeploymentDescriptor, PluginOptions, SecretMode};
use deployenv_core::{
    Error, Result, ScopeSelection, DEFAULT_BACKEND_PROGRAM, DEFAULT_DESCRIPTOR_FILE,
    DEFAULT_REFERENCE_PREFIX, DEPLOYENV_STAGE_VAR,
};
use deployenv_env::{backend_region, DeployEnvironment};
use deployenv_secrets::{CommandBackend, SecretBackend, StaticBackend};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Deployment descriptor to read
    #[arg(short = 'd', long, default_value = DEFAULT_DESCRIPTOR_FILE)]
    pub descriptor: PathBuf,

    /// Stage to resolve (falls back to custom.defaults.stage, then provider.stage)
    #[arg(long, env = DEPLOYENV_STAGE_VAR)]
    pub stage: Option<String>,

    /// Secret handling: enabled, pass-through or disabled
    #[arg(long, default_value = "enabled", value_parser = parse_secret_mode)]
    pub secrets: SecretMode,

    /// Prefix every published key with `<PREFIX>_`
    #[arg(long)]
    pub prefix: Option<String>,

    /// Prefix that marks a secret reference
    #[arg(long, default_value = DEFAULT_REFERENCE_PREFIX)]
    pub reference_prefix: String,

    /// Secret backend region (falls back to provider.region)
    #[arg(long)]
    pub region: Option<String>,

    /// Layered config file, instead of custom.deploy in the descriptor
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Read secrets from this YAML/JSON map instead of the backend program
    #[arg(long)]
    pub secrets_file: Option<PathBuf>,

    /// Secret backend program
    #[arg(long, default_value = DEFAULT_BACKEND_PROGRAM)]
    pub backend_program: String,

    /// Credential table passed to the backend program
    #[arg(long)]
    pub table: Option<String>,

    /// Give up on secret resolution after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent secret fetches
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Do not pass the current environment to commands
    #[arg(long)]
    pub no_inherit_env: bool,

    /// Publish only these scopes (repeatable); all scopes by default
    #[arg(long = "scope", conflicts_with = "root_only")]
    pub scopes: Vec<String>,

    /// Publish root variables only
    #[arg(long)]
    pub root_only: bool,
}

fn parse_secret_mode(value: &str) -> std::result::Result<SecretMode, String> {
    value.parse().map_err(|e: Error| e.to_string())
}

impl GlobalArgs {
    pub fn plugin_options(&self) -> PluginOptions {
        let deploy_scopes = if self.root_only {
            ScopeSelection::RootOnly
        } else if self.scopes.is_empty() {
            ScopeSelection::All
        } else {
            ScopeSelection::Only(self.scopes.clone())
        };

        PluginOptions {
            stage: self.stage.clone(),
            secrets: self.secrets,
            prefix: self.prefix.clone(),
            reference_prefix: self.reference_prefix.clone(),
            region: self.region.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            max_concurrent: self.max_concurrent,
            inherit_env: !self.no_inherit_env,
            deploy_scopes,
            config_file: self.config_file.clone(),
            ..PluginOptions::default()
        }
    }

    /// Values the host exposes through `opt:`
    pub fn option_values(&self, stage: &str) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        values.insert("stage".to_string(), stage.to_string());
        if let Some(region) = &self.region {
            values.insert("region".to_string(), region.clone());
        }
        values.insert("secrets".to_string(), self.secrets.to_string());
        values
    }

    fn backend(&self, region: Option<String>) -> Result<Arc<dyn SecretBackend>> {
        if let Some(path) = &self.secrets_file {
            let mut backend = StaticBackend::from_file(path)?;
            if let Some(region) = region {
                backend = backend.with_region(region);
            }
            return Ok(Arc::new(backend));
        }

        let mut backend = CommandBackend::new(region).with_program(&self.backend_program);
        if let Some(table) = &self.table {
            backend = backend.with_table(table);
        }
        Ok(Arc::new(backend))
    }
}

/// A loaded descriptor and the resolver built for it
pub struct Session {
    pub descriptor_path: PathBuf,
    pub descriptor: DeploymentDescriptor,
    pub plugin: DeployEnvironment,
}

impl Session {
    /// Load the descriptor and prepare a resolver; nothing is fetched yet
    pub fn open(global: &GlobalArgs, options: PluginOptions) -> Result<Self> {
        let descriptor = DeploymentDescriptor::from_path(&global.descriptor)?;
        let base_dir = global
            .descriptor
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let backend = global.backend(backend_region(&options, &descriptor))?;
        let plugin = DeployEnvironment::with_base_dir(&descriptor, options, backend, base_dir)?;

        Ok(Self {
            descriptor_path: global.descriptor.clone(),
            descriptor,
            plugin,
        })
    }

    /// Open and run the initialization pass
    pub async fn initialized(global: &GlobalArgs, options: PluginOptions) -> Result<Self> {
        let mut session = Self::open(global, options)?;
        session.plugin.initialize().await?;
        Ok(session)
    }
}
