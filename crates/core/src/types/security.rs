//! Secret reference syntax and validation

use crate::constants::DEFAULT_REFERENCE_PREFIX;
use crate::errors::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap());
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^:\s]+$").unwrap());

/// A validated `<prefix>:<name>` secret reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretReference {
    prefix: String,
    name: String,
}

impl SecretReference {
    /// The secret name as understood by the backend
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.name)
    }
}

/// How a raw configuration value relates to the reference syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValueKind {
    /// Plain value, passed through untouched
    Literal,
    /// Well-formed secret reference
    Reference(SecretReference),
}

/// The reserved-prefix reference grammar for one resolver instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSyntax {
    prefix: String,
}

impl ReferenceSyntax {
    /// Create a syntax for `prefix`, which must be a plain identifier
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if !PREFIX_REGEX.is_match(&prefix) {
            return Err(Error::configuration(format!(
                "invalid secret reference prefix '{prefix}': must start with a letter and contain only letters, digits, '-' or '_'"
            )));
        }
        Ok(Self { prefix })
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `value` claims to be a reference, well-formed or not.
    ///
    /// A value claims the prefix when it starts with it and the following
    /// character is missing or is not alphanumeric, so `secretary` stays a
    /// literal for the `secret` prefix while `secret_foo` does not.
    #[must_use]
    pub fn is_candidate(&self, value: &str) -> bool {
        match value.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.chars().next().map_or(true, |c| !c.is_alphanumeric()),
            None => false,
        }
    }

    /// Classify a raw value, rejecting malformed references
    pub fn classify(&self, value: &str) -> Result<RawValueKind> {
        if !self.is_candidate(value) {
            return Ok(RawValueKind::Literal);
        }

        let rest = &value[self.prefix.len()..];
        let Some(token) = rest.strip_prefix(':') else {
            return Err(Error::invalid_reference(
                value,
                format!("expected '{}:<name>'", self.prefix),
            ));
        };

        if token.is_empty() {
            return Err(Error::invalid_reference(value, "secret name is empty"));
        }

        if !TOKEN_REGEX.is_match(token) {
            return Err(Error::invalid_reference(
                value,
                "secret name must not contain ':' or whitespace",
            ));
        }

        Ok(RawValueKind::Reference(SecretReference {
            prefix: self.prefix.clone(),
            name: token.to_string(),
        }))
    }

    /// Parse a value that must be a reference
    pub fn parse(&self, value: &str) -> Result<SecretReference> {
        match self.classify(value)? {
            RawValueKind::Reference(reference) => Ok(reference),
            RawValueKind::Literal => Err(Error::invalid_reference(
                value,
                format!("expected '{}:<name>'", self.prefix),
            )),
        }
    }
}

impl Default for ReferenceSyntax {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
        }
    }
}
