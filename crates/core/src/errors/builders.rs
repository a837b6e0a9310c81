//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

// Helper methods for creating errors with context
impl Error {
    /// Create a missing stage error
    #[must_use]
    pub fn missing_stage(message: impl Into<String>) -> Self {
        Error::MissingStage {
            message: message.into(),
        }
    }

    /// Create an invalid reference format error
    #[must_use]
    pub fn invalid_reference(value: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidReferenceFormat {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a missing backend region error for the first reference that needed one
    #[must_use]
    pub fn missing_region(reference: impl Into<String>) -> Self {
        Error::MissingBackendRegion {
            reference: reference.into(),
        }
    }

    /// Create a secret fetch error
    #[must_use]
    pub fn secret_fetch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SecretFetch {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a secret fetch error with a source error
    #[must_use]
    pub fn secret_fetch_with_source(
        name: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::SecretFetch {
            name: name.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a command execution error
    #[must_use]
    pub fn command_execution(
        command: impl Into<String>,
        args: Vec<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::CommandExecution {
            command: command.into(),
            args,
            message: message.into(),
            exit_code,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether this error came out of the secret pipeline
    #[must_use]
    pub fn is_secret_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidReferenceFormat { .. }
                | Error::MissingBackendRegion { .. }
                | Error::SecretFetch { .. }
        )
    }
}
