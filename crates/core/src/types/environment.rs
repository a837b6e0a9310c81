//! Environment-related types for domain-specific operations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Flat key/value environment with deterministic ordering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariables(BTreeMap<String, String>);

impl EnvironmentVariables {
    /// Create a new empty environment
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a variable, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Merge another set of environment variables into this one
    /// Variables in `other` will overwrite existing ones
    pub fn merge(&mut self, other: &Self) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Return a copy with every key rewritten to `<prefix>_<key>`
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| (format!("{prefix}_{k}"), v.clone()))
                .collect(),
        )
    }

    /// Convert to the inner map
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl Deref for EnvironmentVariables {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for EnvironmentVariables {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for EnvironmentVariables {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Type-safe wrapper for stage names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageName(String);

impl StageName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StageName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StageName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Which named scopes take part when an environment is flattened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeSelection {
    /// Root variables plus every scope
    #[default]
    All,
    /// Root variables only
    RootOnly,
    /// Root variables plus the listed scopes
    Only(Vec<String>),
}

impl ScopeSelection {
    fn includes(&self, scope: &str) -> bool {
        match self {
            ScopeSelection::All => true,
            ScopeSelection::RootOnly => false,
            ScopeSelection::Only(names) => names.iter().any(|n| n == scope),
        }
    }
}

/// Root variables plus named scopes, each a flat mapping.
///
/// Flattening overlays the selected scopes on the root in scope-name order,
/// so a later scope wins on key collision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopedEnvironment {
    root: EnvironmentVariables,
    scopes: BTreeMap<String, EnvironmentVariables>,
}

impl ScopedEnvironment {
    #[must_use]
    pub fn new(
        root: EnvironmentVariables,
        scopes: BTreeMap<String, EnvironmentVariables>,
    ) -> Self {
        Self { root, scopes }
    }

    #[must_use]
    pub fn root(&self) -> &EnvironmentVariables {
        &self.root
    }

    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&EnvironmentVariables> {
        self.scopes.get(name)
    }

    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    /// Every value across the root and all scopes
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.root
            .values()
            .chain(self.scopes.values().flat_map(|s| s.values()))
            .map(String::as_str)
    }

    /// Number of entries across the root and all scopes
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len() + self.scopes.values().map(|s| s.len()).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite every value, failing on the first error
    pub fn try_map_values<F, E>(&self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(&str, &str) -> Result<String, E>,
    {
        let mut map = |vars: &EnvironmentVariables| -> Result<EnvironmentVariables, E> {
            vars.iter()
                .map(|(k, v)| f(k, v).map(|resolved| (k.clone(), resolved)))
                .collect()
        };
        let root = map(&self.root)?;
        let mut scopes = BTreeMap::new();
        for (name, vars) in &self.scopes {
            scopes.insert(name.clone(), map(vars)?);
        }
        Ok(Self { root, scopes })
    }

    /// Rewrite every key, in the root and in every scope, to `<prefix>_<key>`
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            root: self.root.with_prefix(prefix),
            scopes: self
                .scopes
                .iter()
                .map(|(name, vars)| (name.clone(), vars.with_prefix(prefix)))
                .collect(),
        }
    }

    /// Collapse into one flat mapping
    #[must_use]
    pub fn flatten(&self, selection: &ScopeSelection) -> EnvironmentVariables {
        let mut flat = self.root.clone();
        for (name, vars) in &self.scopes {
            if selection.includes(name) {
                flat.merge(vars);
            }
        }
        flat
    }
}

/// Output of the layer merge: raw values, references not yet resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedEnvironment(ScopedEnvironment);

impl MergedEnvironment {
    #[must_use]
    pub fn new(inner: ScopedEnvironment) -> Self {
        Self(inner)
    }

    #[must_use]
    pub fn into_inner(self) -> ScopedEnvironment {
        self.0
    }
}

impl Deref for MergedEnvironment {
    type Target = ScopedEnvironment;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
