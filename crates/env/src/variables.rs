//! Variable sources keyed by prefix
//!
//! The host resolves `${<prefix>:<rest>}` expressions in its descriptor by
//! asking the source registered for `<prefix>`. Expressions without a prefix
//! go to the fallback delegate unchanged; a prefix nobody registered is a
//! configuration error.

use async_trait::async_trait;
use deployenv_core::{Error, Result};
use deployenv_secrets::SecretResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

static PREFIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):").unwrap());
static EXPRESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^{}]+)\}").unwrap());

/// Resolves expressions that start with one prefix
#[async_trait]
pub trait VariableSource: Send + Sync {
    /// The prefix this source answers for, without the colon
    fn prefix(&self) -> &str;

    /// Resolve a full `<prefix>:<rest>` expression
    async fn resolve(&self, expression: &str) -> Result<String>;
}

type Fallback = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Registry of variable sources
#[derive(Clone)]
pub struct VariableSources {
    sources: BTreeMap<String, Arc<dyn VariableSource>>,
    fallback: Fallback,
}

impl VariableSources {
    /// Empty registry whose fallback echoes the expression
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            fallback: Arc::new(|expression| Ok(expression.to_string())),
        }
    }

    /// Registry with the host's own `env:` and `opt:` sources
    #[must_use]
    pub fn with_host_sources(options: BTreeMap<String, String>) -> Self {
        let mut sources = Self::new();
        sources.register(Arc::new(EnvSource));
        sources.register(Arc::new(OptionSource::new(options)));
        sources
    }

    /// Register `source`, replacing any source with the same prefix
    pub fn register(&mut self, source: Arc<dyn VariableSource>) -> Option<Arc<dyn VariableSource>> {
        let prefix = source.prefix().to_string();
        tracing::debug!(prefix = %prefix, "registering variable source");
        self.sources.insert(prefix, source)
    }

    /// Handle expressions that carry no prefix
    #[must_use]
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Resolve one expression such as `env:HOME` or `credstash:db.password`
    pub async fn resolve(&self, expression: &str) -> Result<String> {
        let expression = expression.trim();
        let Some(captures) = PREFIXED.captures(expression) else {
            return (self.fallback)(expression);
        };

        let prefix = &captures[1];
        match self.sources.get(prefix) {
            Some(source) => source.resolve(expression).await,
            None => Err(Error::configuration(format!(
                "no variable source registered for '{prefix}:' in '{expression}'"
            ))),
        }
    }

    /// Replace every `${expression}` in `text`
    pub async fn interpolate(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for captures in EXPRESSION.captures_iter(text) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.resolve(inner.as_str()).await?);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

impl Default for VariableSources {
    fn default() -> Self {
        Self::new()
    }
}

fn strip<'a>(expression: &'a str, prefix: &str) -> &'a str {
    expression
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(expression)
}

/// `env:<NAME>` reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

#[async_trait]
impl VariableSource for EnvSource {
    fn prefix(&self) -> &str {
        "env"
    }

    async fn resolve(&self, expression: &str) -> Result<String> {
        let name = strip(expression, self.prefix());
        std::env::var(name).map_err(|_| {
            Error::configuration(format!("environment variable '{name}' is not set"))
        })
    }
}

/// `opt:<name>` reads the host's command options
#[derive(Debug, Clone, Default)]
pub struct OptionSource {
    options: BTreeMap<String, String>,
}

impl OptionSource {
    #[must_use]
    pub fn new(options: BTreeMap<String, String>) -> Self {
        Self { options }
    }
}

#[async_trait]
impl VariableSource for OptionSource {
    fn prefix(&self) -> &str {
        "opt"
    }

    async fn resolve(&self, expression: &str) -> Result<String> {
        let name = strip(expression, self.prefix());
        self.options
            .get(name)
            .cloned()
            .ok_or_else(|| Error::configuration(format!("option '{name}' was not provided")))
    }
}

/// Secret references resolved through a [`SecretResolver`]
pub struct SecretSource {
    resolver: Arc<SecretResolver>,
}

impl SecretSource {
    #[must_use]
    pub fn new(resolver: Arc<SecretResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl VariableSource for SecretSource {
    fn prefix(&self) -> &str {
        self.resolver.syntax().prefix()
    }

    async fn resolve(&self, expression: &str) -> Result<String> {
        self.resolver.resolve_value(expression).await
    }
}
