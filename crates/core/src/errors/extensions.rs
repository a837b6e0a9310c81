//! Extension traits for error handling

use super::types::{Error, Result};
use std::path::Path;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Prefix the error message with `message`
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Prefix the error message with a lazily built message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        let message = message.into();
        self.with_context(|| message)
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            // Secret and stage errors are user facing and keep their kind
            err @ (Error::MissingStage { .. }
            | Error::InvalidReferenceFormat { .. }
            | Error::MissingBackendRegion { .. }
            | Error::SecretFetch { .. }) => err,
            other => Error::Configuration {
                message: format!("{}: {}", f(), other),
            },
        })
    }
}

/// Attach a path and operation to raw io results
pub trait IoResultExt<T> {
    fn for_path(self, path: &Path, operation: &str) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn for_path(self, path: &Path, operation: &str) -> Result<T> {
        self.map_err(|e| Error::file_system(path, operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_configuration() {
        let result: std::result::Result<(), Error> = Err(Error::configuration("inner"));
        let err = result.context("loading config").unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: loading config: configuration error: inner"
        );
    }

    #[test]
    fn test_context_keeps_secret_errors() {
        let result: std::result::Result<(), Error> = Err(Error::secret_fetch("db", "denied"));
        let err = result.context("resolving").unwrap_err();
        assert!(matches!(err, Error::SecretFetch { .. }));
    }

    #[test]
    fn test_for_path_records_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result
            .for_path(Path::new("/tmp/deploy.yml"), "read")
            .unwrap_err();
        assert!(err.to_string().contains("/tmp/deploy.yml"));
    }
}
