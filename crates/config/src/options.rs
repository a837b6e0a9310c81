//! Options controlling one resolver instance

use deployenv_core::{Error, Result, ScopeSelection, DEFAULT_REFERENCE_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// What to do with secret references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretMode {
    /// Fetch every reference from the backend
    #[default]
    Enabled,
    /// Validate references but leave them as literal strings
    PassThrough,
    /// Do not look for references at all
    Disabled,
}

impl FromStr for SecretMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "enabled" | "on" => Ok(SecretMode::Enabled),
            "false" | "pass-through" | "passthrough" | "skip" => Ok(SecretMode::PassThrough),
            "disabled" | "off" => Ok(SecretMode::Disabled),
            other => Err(Error::configuration(format!(
                "unknown secret mode '{other}': expected enabled, pass-through or disabled"
            ))),
        }
    }
}

impl fmt::Display for SecretMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecretMode::Enabled => "enabled",
            SecretMode::PassThrough => "pass-through",
            SecretMode::Disabled => "disabled",
        })
    }
}

/// Extra arguments for the ad-hoc command.
///
/// A line is appended verbatim; a list is shell-quoted item by item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandArgs {
    Line(String),
    List(Vec<String>),
}

impl CommandArgs {
    /// The text appended after the command
    #[must_use]
    pub fn as_line(&self) -> String {
        match self {
            CommandArgs::Line(line) => line.clone(),
            CommandArgs::List(items) => shell_words::join(items),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            CommandArgs::Line(line) => line.trim().is_empty(),
            CommandArgs::List(items) => items.is_empty(),
        }
    }
}

impl Default for CommandArgs {
    fn default() -> Self {
        CommandArgs::List(Vec::new())
    }
}

/// Parameters of the `runWithEnvironment` command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub command: Option<String>,
    pub args: CommandArgs,
    /// Stage for this run only; defaults to the active stage
    pub stage: Option<String>,
}

/// Options for a resolver instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    /// Explicit stage; falls back to `custom.defaults.stage`, then `provider.stage`
    pub stage: Option<String>,
    pub secrets: SecretMode,
    /// Rewrite every published key to `<prefix>_<key>`
    pub prefix: Option<String>,
    /// Reserved prefix marking secret references
    pub reference_prefix: String,
    /// Backend region; falls back to `provider.region`
    pub region: Option<String>,
    /// Bound on one resolution pass
    pub timeout: Option<Duration>,
    /// Cap on concurrent backend calls within a pass
    pub max_concurrent: Option<usize>,
    /// Whether subprocesses inherit the current process environment
    pub inherit_env: bool,
    /// Scopes published to the descriptor
    pub deploy_scopes: ScopeSelection,
    /// External layered config file, overriding `custom.deploy.file`
    pub config_file: Option<PathBuf>,
    pub run: RunOptions,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            stage: None,
            secrets: SecretMode::default(),
            prefix: None,
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            region: None,
            timeout: None,
            max_concurrent: None,
            inherit_env: true,
            deploy_scopes: ScopeSelection::All,
            config_file: None,
            run: RunOptions::default(),
        }
    }
}

impl PluginOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    #[must_use]
    pub fn with_secrets(mut self, mode: SecretMode) -> Self {
        self.secrets = mode;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reference_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_run(mut self, run: RunOptions) -> Self {
        self.run = run;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_mode_parsing() {
        assert_eq!("true".parse::<SecretMode>().unwrap(), SecretMode::Enabled);
        assert_eq!("false".parse::<SecretMode>().unwrap(), SecretMode::PassThrough);
        assert_eq!(
            "Pass-Through".parse::<SecretMode>().unwrap(),
            SecretMode::PassThrough
        );
        assert_eq!("off".parse::<SecretMode>().unwrap(), SecretMode::Disabled);
        assert!("maybe".parse::<SecretMode>().is_err());
    }

    #[test]
    fn test_command_args_line() {
        assert_eq!(CommandArgs::Line("--fix src".into()).as_line(), "--fix src");
        assert_eq!(
            CommandArgs::List(vec!["-a".into(), "b c".into()]).as_line(),
            "-a 'b c'"
        );
        assert!(CommandArgs::default().is_empty());
    }

    #[test]
    fn test_command_args_deserialize_either_shape() {
        let line: CommandArgs = serde_json::from_str(r#""-v""#).unwrap();
        assert_eq!(line, CommandArgs::Line("-v".into()));
        let list: CommandArgs = serde_json::from_str(r#"["-v", "x"]"#).unwrap();
        assert_eq!(list, CommandArgs::List(vec!["-v".into(), "x".into()]));
    }

    #[test]
    fn test_defaults() {
        let options = PluginOptions::default();
        assert_eq!(options.reference_prefix, "credstash");
        assert!(options.inherit_env);
        assert_eq!(options.secrets, SecretMode::Enabled);
    }
}
