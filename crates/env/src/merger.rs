//! Stage-aware layer merging
//!
//! The `default` layer is overridden key by key by the active stage's layer.
//! Named scopes (`lambda`, `sls`, ...) are merged independently with the same
//! rule. When one layer has a scope and the other a literal under the same
//! key, the stage layer's shape wins. A configured prefix is applied to the
//! merged keys, never before the merge.

use deployenv_config::{RawConfig, RawLayer, RawValue};
use deployenv_core::{EnvironmentVariables, MergedEnvironment, ScopedEnvironment};
use std::collections::BTreeMap;

/// Combines the default layer with a stage layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMerger {
    prefix: Option<String>,
}

impl EnvironmentMerger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite every merged key to `<prefix>_<key>`; an empty prefix is ignored
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Merge `stage` over `default`. Absent layers count as empty.
    #[must_use]
    pub fn merge(&self, default: Option<&RawLayer>, stage: Option<&RawLayer>) -> MergedEnvironment {
        let mut combined = default.cloned().unwrap_or_default();

        for (key, value) in stage.into_iter().flatten() {
            match (combined.get_mut(key), value) {
                (Some(RawValue::Scope(existing)), RawValue::Scope(overrides)) => {
                    existing.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                _ => {
                    combined.insert(key.clone(), value.clone());
                }
            }
        }

        let mut root = EnvironmentVariables::new();
        let mut scopes = BTreeMap::new();
        for (key, value) in combined {
            match value {
                RawValue::Literal(literal) => {
                    root.insert(key, literal);
                }
                RawValue::Scope(vars) => {
                    scopes.insert(key, vars.into_iter().collect::<EnvironmentVariables>());
                }
            }
        }

        let merged = ScopedEnvironment::new(root, scopes);
        match &self.prefix {
            Some(prefix) => MergedEnvironment::new(merged.with_prefix(prefix)),
            None => MergedEnvironment::new(merged),
        }
    }

    /// Merge the layers `raw` holds for `stage`
    #[must_use]
    pub fn merge_stage(&self, raw: &RawConfig, stage: &str) -> MergedEnvironment {
        if raw.layer(stage).is_none() {
            tracing::debug!(stage, "no layer for stage, using defaults only");
        }
        self.merge(raw.default_layer(), raw.layer(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deployenv_core::ScopeSelection;
    use serde_json::json;

    fn layer(pairs: &[(&str, &str)]) -> RawLayer {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::Literal(v.to_string())))
            .collect()
    }

    fn flat(merged: &MergedEnvironment) -> Vec<(String, String)> {
        merged.flatten(&ScopeSelection::All).into_iter().collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_disjoint_keys_are_combined() {
        let merged = EnvironmentMerger::new().merge(
            Some(&layer(&[("a", "1")])),
            Some(&layer(&[("b", "2")])),
        );
        assert_eq!(flat(&merged), pairs(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_stage_overrides_default() {
        let merged = EnvironmentMerger::new().merge(
            Some(&layer(&[("a", "1")])),
            Some(&layer(&[("a", "2")])),
        );
        assert_eq!(flat(&merged), pairs(&[("a", "2")]));
    }

    #[test]
    fn test_absent_layers() {
        let merger = EnvironmentMerger::new();
        let defaults = layer(&[("a", "1")]);

        assert_eq!(flat(&merger.merge(Some(&defaults), None)), pairs(&[("a", "1")]));
        assert_eq!(
            flat(&merger.merge(Some(&defaults), Some(&RawLayer::new()))),
            pairs(&[("a", "1")])
        );
        assert_eq!(flat(&merger.merge(None, Some(&defaults))), pairs(&[("a", "1")]));
        assert!(merger.merge(None, None).is_empty());
    }

    #[test]
    fn test_scopes_merge_independently() {
        let raw = RawConfig::from_value(
            &json!({
                "default": {"A": "root", "lambda": {"L1": "d", "L2": "d"}, "local": {"X": "1"}},
                "prod": {"lambda": {"L2": "p", "L3": "p"}}
            }),
            "environments",
        )
        .unwrap();

        let merged = EnvironmentMerger::new().merge_stage(&raw, "prod");
        let lambda = merged.scope("lambda").unwrap();
        assert_eq!(lambda.get("L1").unwrap(), "d");
        assert_eq!(lambda.get("L2").unwrap(), "p");
        assert_eq!(lambda.get("L3").unwrap(), "p");
        assert_eq!(merged.scope("local").unwrap().get("X").unwrap(), "1");
        assert_eq!(merged.root().get("A").unwrap(), "root");
    }

    #[test]
    fn test_stage_shape_wins() {
        let raw = RawConfig::from_value(
            &json!({
                "default": {"lambda": {"L": "1"}, "plain": "x"},
                "prod": {"lambda": "flattened", "plain": {"P": "scoped"}}
            }),
            "environments",
        )
        .unwrap();

        let merged = EnvironmentMerger::new().merge_stage(&raw, "prod");
        assert_eq!(merged.root().get("lambda").unwrap(), "flattened");
        assert!(merged.scope("lambda").is_none());
        assert_eq!(merged.scope("plain").unwrap().get("P").unwrap(), "scoped");
        assert!(!merged.root().contains_key("plain"));
    }

    #[test]
    fn test_prefix_applied_after_merge() {
        let merger = EnvironmentMerger::new().with_prefix(Some("APP".into()));
        let merged = merger.merge(
            Some(&layer(&[("a", "1"), ("b", "1")])),
            Some(&layer(&[("a", "2")])),
        );
        assert_eq!(flat(&merged), pairs(&[("APP_a", "2"), ("APP_b", "1")]));
    }

    #[test]
    fn test_empty_prefix_ignored() {
        let merger = EnvironmentMerger::new().with_prefix(Some(String::new()));
        assert!(merger.prefix().is_none());
        let merged = merger.merge(Some(&layer(&[("a", "1")])), None);
        assert_eq!(flat(&merged), pairs(&[("a", "1")]));
    }

    #[test]
    fn test_unknown_stage_uses_defaults() {
        let raw = RawConfig::from_value(&json!({"default": {"a": 1}}), "environments").unwrap();
        let merged = EnvironmentMerger::new().merge_stage(&raw, "nope");
        assert_eq!(flat(&merged), pairs(&[("a", "1")]));
    }
}
