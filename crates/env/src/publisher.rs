//! Publishing resolved environments
//!
//! Two targets: the deployment descriptor's runtime environment (and its
//! deploy variables), and a subprocess about to be spawned. Both use extend
//! semantics: existing keys survive unless the resolved mapping overrides
//! them, so publishing twice with the same input is a no-op.

use deployenv_config::DeploymentDescriptor;
use deployenv_core::{EnvironmentVariables, ScopeSelection};
use deployenv_secrets::ResolvedEnvironment;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::process::Command;

/// Writes resolved environments into a deployment descriptor
#[derive(Debug, Clone, Default)]
pub struct EnvironmentPublisher {
    selection: ScopeSelection,
}

impl EnvironmentPublisher {
    #[must_use]
    pub fn new(selection: ScopeSelection) -> Self {
        Self { selection }
    }

    /// Extend `provider.environment` with `resolved`, creating it if missing.
    /// Returns the number of keys written.
    pub fn publish_to_descriptor(
        &self,
        resolved: &ResolvedEnvironment,
        descriptor: &mut DeploymentDescriptor,
    ) -> usize {
        let flat = resolved.flatten(&self.selection);
        let count = flat.len();
        extend(descriptor.environment_mut(), flat);
        tracing::debug!(count, "published environment to descriptor");
        count
    }

    /// Extend the descriptor's `deployVariables` with `resolved`
    pub fn publish_variables(
        &self,
        resolved: &ResolvedEnvironment,
        descriptor: &mut DeploymentDescriptor,
    ) -> usize {
        let flat = resolved.flatten(&ScopeSelection::All);
        let count = flat.len();
        if count > 0 || descriptor.deploy_variables.is_some() {
            extend(
                descriptor.deploy_variables.get_or_insert_with(IndexMap::new),
                flat,
            );
        }
        count
    }
}

fn extend(target: &mut IndexMap<String, Value>, vars: EnvironmentVariables) {
    target.extend(vars.into_iter().map(|(k, v)| (k, Value::String(v))));
}

/// Environment handed to a subprocess at spawn time.
///
/// The overlay is immutable and never touches the current process
/// environment; it is applied to each [`Command`] it configures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentOverlay {
    vars: EnvironmentVariables,
    inherit: bool,
}

impl EnvironmentOverlay {
    #[must_use]
    pub fn new(vars: EnvironmentVariables, inherit: bool) -> Self {
        Self { vars, inherit }
    }

    /// Overlay every scope of `resolved`
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedEnvironment, inherit: bool) -> Self {
        Self::new(resolved.flatten(&ScopeSelection::All), inherit)
    }

    #[must_use]
    pub fn vars(&self) -> &EnvironmentVariables {
        &self.vars
    }

    #[must_use]
    pub fn inherits(&self) -> bool {
        self.inherit
    }

    /// Configure `command` to see the overlay
    pub fn apply(&self, command: &mut Command) {
        if !self.inherit {
            command.env_clear();
        }
        command.envs(self.vars.iter());
    }

    /// The complete environment a subprocess receives, given its parent's
    #[must_use]
    pub fn build<I>(&self, base: I) -> EnvironmentVariables
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env = if self.inherit {
            base.into_iter().collect()
        } else {
            EnvironmentVariables::new()
        };
        env.merge(&self.vars);
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deployenv_config::SecretMode;
    use deployenv_core::{MergedEnvironment, ReferenceSyntax, ScopedEnvironment};
    use deployenv_secrets::{SecretResolver, StaticBackend};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    async fn resolved(
        root: &[(&str, &str)],
        scopes: Vec<(&str, Vec<(&str, &str)>)>,
    ) -> ResolvedEnvironment {
        let scopes = scopes
            .into_iter()
            .map(|(name, vars)| (name.to_string(), vars.into_iter().collect()))
            .collect::<BTreeMap<String, EnvironmentVariables>>();
        let merged = MergedEnvironment::new(ScopedEnvironment::new(
            root.iter().copied().collect(),
            scopes,
        ));
        SecretResolver::new(
            Arc::new(StaticBackend::new()),
            ReferenceSyntax::default(),
            SecretMode::Disabled,
        )
        .resolve(&merged)
        .await
        .unwrap()
    }

    fn env_of(descriptor: &DeploymentDescriptor) -> Vec<(String, String)> {
        descriptor.environment_strings().into_iter().collect()
    }

    #[tokio::test]
    async fn test_publish_extends_and_overrides() {
        let mut descriptor = DeploymentDescriptor::default();
        descriptor
            .environment_mut()
            .insert("x".into(), Value::String("old".into()));

        let env = resolved(&[("x", "new"), ("y", "val")], vec![]).await;
        let publisher = EnvironmentPublisher::default();
        assert_eq!(publisher.publish_to_descriptor(&env, &mut descriptor), 2);

        let expected = vec![
            ("x".to_string(), "new".to_string()),
            ("y".to_string(), "val".to_string()),
        ];
        assert_eq!(env_of(&descriptor), expected);

        publisher.publish_to_descriptor(&env, &mut descriptor);
        assert_eq!(env_of(&descriptor), expected);
    }

    #[tokio::test]
    async fn test_publish_keeps_unrelated_keys() {
        let mut descriptor = DeploymentDescriptor::default();
        descriptor
            .environment_mut()
            .insert("KEEP".into(), Value::from(3));

        let env = resolved(&[("a", "1")], vec![]).await;
        EnvironmentPublisher::default().publish_to_descriptor(&env, &mut descriptor);

        let published = descriptor.environment_strings();
        assert_eq!(published["KEEP"], "3");
        assert_eq!(published["a"], "1");
    }

    #[tokio::test]
    async fn test_publish_creates_missing_environment() {
        let mut descriptor = DeploymentDescriptor::default();
        assert!(descriptor.provider.environment.is_none());

        let env = resolved(&[], vec![]).await;
        EnvironmentPublisher::default().publish_to_descriptor(&env, &mut descriptor);
        assert!(descriptor.provider.environment.is_some());
    }

    #[tokio::test]
    async fn test_scope_selection() {
        let env = resolved(
            &[("A", "root")],
            vec![("lambda", vec![("L", "1")]), ("local", vec![("X", "1")])],
        )
        .await;

        let mut descriptor = DeploymentDescriptor::default();
        EnvironmentPublisher::new(ScopeSelection::Only(vec!["lambda".into()]))
            .publish_to_descriptor(&env, &mut descriptor);

        let published = descriptor.environment_strings();
        assert!(published.contains_key("L"));
        assert!(!published.contains_key("X"));
    }

    #[tokio::test]
    async fn test_publish_variables() {
        let mut descriptor = DeploymentDescriptor::default();
        let publisher = EnvironmentPublisher::default();

        let empty = resolved(&[], vec![]).await;
        assert_eq!(publisher.publish_variables(&empty, &mut descriptor), 0);
        assert!(descriptor.deploy_variables.is_none());

        let vars = resolved(&[("memory", "512")], vec![]).await;
        publisher.publish_variables(&vars, &mut descriptor);
        assert_eq!(
            descriptor.deploy_variables.as_ref().unwrap()["memory"],
            Value::String("512".into())
        );
        assert!(descriptor.provider.environment.is_none());
    }

    #[test]
    fn test_overlay_build() {
        let vars: EnvironmentVariables = [("A", "resolved"), ("B", "2")].into_iter().collect();
        let base = vec![
            ("A".to_string(), "parent".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ];

        let inherited = EnvironmentOverlay::new(vars.clone(), true).build(base.clone());
        assert_eq!(inherited.get("A").unwrap(), "resolved");
        assert_eq!(inherited.get("PATH").unwrap(), "/bin");

        let isolated = EnvironmentOverlay::new(vars.clone(), false).build(base);
        assert_eq!(isolated, vars);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overlay_apply_without_inherit() {
        let vars: EnvironmentVariables = [("DEPLOYENV_OVERLAY_TEST", "yes")].into_iter().collect();
        let overlay = EnvironmentOverlay::new(vars, false);

        let mut command = Command::new("/usr/bin/env");
        overlay.apply(&mut command);
        let output = command.output().await.unwrap();

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim(), "DEPLOYENV_OVERLAY_TEST=yes");
        assert!(std::env::var("DEPLOYENV_OVERLAY_TEST").is_err());
    }
}
