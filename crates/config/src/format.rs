//! Reading and writing structured files by extension

use deployenv_core::{Error, IoResultExt, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Structured text formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// `.json` is JSON; everything else is read as YAML, which also accepts JSON
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, contents: &str) -> Result<T> {
        match self {
            FileFormat::Json => Ok(serde_json::from_str(contents)?),
            FileFormat::Yaml => Ok(serde_yaml::from_str(contents)?),
        }
    }

    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            FileFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            FileFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }
}

/// Read and parse `path`, choosing the format from its extension
pub fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).for_path(path, "read")?;
    FileFormat::from_path(path).parse(&contents).map_err(|e| match e {
        Error::Json { message, source } => Error::Json {
            message: format!("{}: {message}", path.display()),
            source,
        },
        Error::Yaml { message, source } => Error::Yaml {
            message: format!("{}: {message}", path.display()),
            source,
        },
        other => other,
    })
}
