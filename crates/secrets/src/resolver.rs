//! Secret resolution over a merged environment
//!
//! One call to [`SecretResolver::resolve`] is one resolution pass:
//!
//! 1. every value is classified; a malformed reference fails the pass before
//!    anything is fetched
//! 2. references are de-duplicated by secret name
//! 3. the backend region is checked
//! 4. distinct names are fetched concurrently on the calling task
//! 5. the first error drops the remaining fetches and fails the pass
//!
//! A [`ResolvedEnvironment`] is only ever built from a pass that resolved
//! every reference.

use crate::backend::SecretBackend;
use deployenv_config::SecretMode;
use deployenv_core::{
    Error, MergedEnvironment, PassState, RawValueKind, ReferenceSyntax, Result,
    ScopedEnvironment, SecretReference,
};
use deployenv_utils::bounded;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashMap};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// A merged environment with every secret reference replaced by its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvironment(ScopedEnvironment);

impl ResolvedEnvironment {
    #[must_use]
    pub fn into_inner(self) -> ScopedEnvironment {
        self.0
    }
}

impl Deref for ResolvedEnvironment {
    type Target = ScopedEnvironment;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Resolves secret references through a pluggable backend
pub struct SecretResolver {
    backend: Arc<dyn SecretBackend>,
    syntax: ReferenceSyntax,
    mode: SecretMode,
    max_concurrent: Option<usize>,
    timeout: Option<Duration>,
}

impl SecretResolver {
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>, syntax: ReferenceSyntax, mode: SecretMode) -> Self {
        Self {
            backend,
            syntax,
            mode,
            max_concurrent: None,
            timeout: None,
        }
    }

    /// Cap the number of fetches in flight; unlimited by default
    #[must_use]
    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent = limit;
        self
    }

    /// Bound each pass; outstanding fetches are dropped on expiry
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn syntax(&self) -> &ReferenceSyntax {
        &self.syntax
    }

    #[must_use]
    pub fn mode(&self) -> SecretMode {
        self.mode
    }

    /// Validate every value and collect the distinct references
    pub fn collect_references(&self, env: &ScopedEnvironment) -> Result<BTreeSet<SecretReference>> {
        let mut references = BTreeSet::new();
        for value in env.values() {
            if let RawValueKind::Reference(reference) = self.syntax.classify(value)? {
                references.insert(reference);
            }
        }
        Ok(references)
    }

    /// Run one resolution pass over `merged`
    pub async fn resolve(&self, merged: &MergedEnvironment) -> Result<ResolvedEnvironment> {
        let mut state = PassState::Idle;
        let result = self.run_pass(merged, &mut state).await;
        if result.is_err() && !state.is_terminal() {
            state = state.transition(PassState::Failed)?;
        }
        tracing::debug!(state = %state, "resolution pass finished");
        result
    }

    async fn run_pass(
        &self,
        merged: &MergedEnvironment,
        state: &mut PassState,
    ) -> Result<ResolvedEnvironment> {
        if self.mode == SecretMode::Disabled {
            *state = state.transition(PassState::Fetching)?;
            *state = state.transition(PassState::Resolved)?;
            return Ok(ResolvedEnvironment(merged.deref().clone()));
        }

        let references = self.collect_references(merged)?;

        if self.mode == SecretMode::PassThrough {
            for reference in &references {
                tracing::info!("Skipping secret resolution for variable '{reference}'");
            }
            *state = state.transition(PassState::Fetching)?;
            *state = state.transition(PassState::Resolved)?;
            return Ok(ResolvedEnvironment(merged.deref().clone()));
        }

        if let Some(first) = references.iter().next() {
            if self.backend.region().is_none() {
                return Err(Error::missing_region(first.to_string()));
            }
        }

        *state = state.transition(PassState::Fetching)?;
        tracing::debug!(count = references.len(), "fetching secrets");

        let fetched = bounded("secret resolution", self.timeout, self.fetch_all(&references)).await?;

        let resolved = merged.try_map_values(|_, value| match self.syntax.classify(value)? {
            RawValueKind::Literal => Ok(value.to_string()),
            RawValueKind::Reference(reference) => {
                fetched.get(reference.name()).cloned().ok_or_else(|| {
                    Error::secret_fetch(reference.name(), "secret missing from resolution pass")
                })
            }
        })?;

        *state = state.transition(PassState::Resolved)?;
        Ok(ResolvedEnvironment(resolved))
    }

    /// Fetch each distinct reference once, failing on the first error
    async fn fetch_all(
        &self,
        references: &BTreeSet<SecretReference>,
    ) -> Result<HashMap<String, String>> {
        if references.is_empty() {
            return Ok(HashMap::new());
        }

        let limit = self.max_concurrent.unwrap_or(references.len()).max(1);
        let backend = &self.backend;

        stream::iter(references.iter())
            .map(|reference| async move {
                let value = backend.get(reference.name()).await?;
                tracing::debug!(name = reference.name(), "resolved secret");
                Ok::<_, Error>((reference.name().to_string(), value))
            })
            .buffer_unordered(limit)
            .try_collect()
            .await
    }

    /// Resolve a single `<prefix>:<name>` expression outside a full pass
    pub async fn resolve_value(&self, value: &str) -> Result<String> {
        match self.mode {
            SecretMode::Disabled => Ok(value.to_string()),
            SecretMode::PassThrough => {
                self.syntax.parse(value)?;
                tracing::info!("Skipping secret resolution for variable '{value}'");
                Ok(value.to_string())
            }
            SecretMode::Enabled => {
                let reference = self.syntax.parse(value)?;
                if self.backend.region().is_none() {
                    return Err(Error::missing_region(reference.to_string()));
                }
                bounded(
                    "secret resolution",
                    self.timeout,
                    self.backend.get(reference.name()),
                )
                .await
            }
        }
    }
}
