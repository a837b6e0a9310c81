//! Configuration loader for deployenv
//!
//! Layered configuration comes from the descriptor's `custom.deploy` section
//! or from an external YAML/JSON file. An inline section looks like:
//!
//! ```yaml
//! custom:
//!   deploy:
//!     prefix: APP            # optional
//!     file: deploy.yml       # optional, replaces the inline layers
//!     environments:
//!       default: { LOG_LEVEL: info }
//!       prod: { LOG_LEVEL: warn, DB_PASSWORD: "credstash:prod.db" }
//!     variables:
//!       default: { memory: 512 }
//! ```
//!
//! An external file either uses the same `environments`/`variables` sections or
//! is itself the environments layers (`{default: ..., prod: ...}`).

use crate::descriptor::DeploymentDescriptor;
use crate::format::read_structured;
use crate::raw::{scalar_to_string, RawConfig};
use deployenv_core::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

const DEPLOY_SECTION: &str = "deploy";
const ENVIRONMENTS_KEY: &str = "environments";
const VARIABLES_KEY: &str = "variables";
const PREFIX_KEY: &str = "prefix";
const FILE_KEY: &str = "file";

/// Where the layered configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Inline,
    File(PathBuf),
    /// No deploy section at all; everything is empty
    Missing,
}

/// Raw configuration ready for merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    /// Layers published to the runtime environment
    pub environments: RawConfig,
    /// Layers published to the descriptor's deploy variables
    pub variables: RawConfig,
    /// Key prefix declared alongside the layers
    pub prefix: Option<String>,
    pub source: ConfigSource,
}

impl LoadedConfig {
    fn empty() -> Self {
        Self {
            environments: RawConfig::default(),
            variables: RawConfig::default(),
            prefix: None,
            source: ConfigSource::Missing,
        }
    }
}

/// Loads raw layered configuration once, at initialization
pub struct ConfigLoader {
    /// Directory relative file paths are resolved against
    base_dir: PathBuf,
    /// Explicit file taking precedence over the descriptor
    file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            file: None,
        }
    }

    /// Set the directory relative paths are resolved against
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Load from `file` instead of the descriptor
    pub fn file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    /// Load the layered configuration for `descriptor`
    pub fn load(&self, descriptor: &DeploymentDescriptor) -> Result<LoadedConfig> {
        let inline = descriptor.custom_value(&[DEPLOY_SECTION]);

        let file = match &self.file {
            Some(path) => Some(path.clone()),
            None => inline
                .and_then(|deploy| deploy.get(FILE_KEY))
                .map(|value| {
                    value.as_str().map(PathBuf::from).ok_or_else(|| {
                        Error::configuration("custom.deploy.file must be a string path")
                    })
                })
                .transpose()?,
        };

        if let Some(path) = file {
            let path = self.resolve_path(&path);
            tracing::debug!(path = %path.display(), "loading deploy configuration file");
            return self.load_file(&path);
        }

        match inline {
            Some(deploy) => {
                let mut loaded = parse_sections(deploy, "custom.deploy")?;
                loaded.source = ConfigSource::Inline;
                Ok(loaded)
            }
            None => {
                tracing::warn!(
                    "No deploy object found in custom, even though the deploy environment resolver is loaded"
                );
                Ok(LoadedConfig::empty())
            }
        }
    }

    /// Load an external layered file
    pub fn load_file(&self, path: &Path) -> Result<LoadedConfig> {
        let value: Value = read_structured(path)?;
        let label = path.display().to_string();

        let sectioned = value
            .as_object()
            .is_some_and(|o| o.contains_key(ENVIRONMENTS_KEY) || o.contains_key(VARIABLES_KEY));

        let mut loaded = if sectioned {
            parse_sections(&value, &label)?
        } else {
            LoadedConfig {
                environments: RawConfig::from_value(&value, &label)?,
                ..LoadedConfig::empty()
            }
        };
        loaded.source = ConfigSource::File(path.to_path_buf());
        Ok(loaded)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_sections(value: &Value, label: &str) -> Result<LoadedConfig> {
    if !value.is_object() {
        return Err(Error::configuration(format!("'{label}' must be a mapping")));
    }

    let section = |key: &str| -> Result<RawConfig> {
        let name = format!("{label}.{key}");
        RawConfig::from_value(value.get(key).unwrap_or(&Value::Null), &name)
    };

    let prefix = match value.get(PREFIX_KEY) {
        None | Some(Value::Null) => None,
        Some(raw) => Some(scalar_to_string(raw).ok_or_else(|| {
            Error::configuration(format!("'{label}.{PREFIX_KEY}' must be a string"))
        })?),
    };

    Ok(LoadedConfig {
        environments: section(ENVIRONMENTS_KEY)?,
        variables: section(VARIABLES_KEY)?,
        prefix: prefix.filter(|p| !p.is_empty()),
        source: ConfigSource::Inline,
    })
}
