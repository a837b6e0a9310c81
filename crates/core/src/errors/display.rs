//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingStage { message } => {
                write!(f, "no stage found for deploy environment: {message}")
            }
            Error::InvalidReferenceFormat { value, message } => {
                write!(f, "invalid secret reference '{value}': {message}")
            }
            Error::MissingBackendRegion { reference } => {
                write!(
                    f,
                    "cannot resolve secret reference '{reference}' without a region"
                )
            }
            Error::SecretFetch { name, message, .. } => {
                write!(f, "failed to fetch secret '{name}': {message}")
            }
            Error::CommandExecution {
                command,
                args,
                message,
                exit_code,
            } => {
                let args_str = args.join(" ");
                let shown = if args_str.is_empty() {
                    command.clone()
                } else {
                    format!("{command} {args_str}")
                };
                match exit_code {
                    Some(code) => {
                        write!(f, "command '{shown}' failed with exit code {code}: {message}")
                    }
                    None => write!(f, "command '{shown}' failed: {message}"),
                }
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
            Error::Yaml { message, .. } => {
                write!(f, "YAML error: {message}")
            }
            Error::Timeout {
                operation,
                duration,
            } => {
                write!(f, "operation '{operation}' timed out after {duration:?}")
            }
        }
    }
}
