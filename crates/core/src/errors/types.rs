//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for deployenv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for deployenv operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No stage could be determined from options or defaults
    MissingStage { message: String },

    /// A value carries the reference prefix but is not a well-formed reference
    InvalidReferenceFormat { value: String, message: String },

    /// Secret resolution was requested without a backend region
    MissingBackendRegion { reference: String },

    /// The secret backend failed to produce a value
    SecretFetch {
        name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Command execution errors
    CommandExecution {
        command: String,
        args: Vec<String>,
        message: String,
        exit_code: Option<i32>,
    },

    /// Configuration errors
    Configuration { message: String },

    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML serialization/deserialization errors
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Operation timeout errors
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },
}
