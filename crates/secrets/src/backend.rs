//! Secret backends
//!
//! A backend is the opaque `get(name) -> secret` capability of a secret
//! store. The resolver owns one handle and never reaches for global state, so
//! tests substitute [`StaticBackend`] for the real command-driven store.

use async_trait::async_trait;
use deployenv_core::{Error, IoResultExt, Result, ResultExt, DEFAULT_BACKEND_PROGRAM};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::process::Command;

/// Access to an external secret store
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Region or endpoint the backend talks to, if configured
    fn region(&self) -> Option<&str>;

    /// Fetch the secret stored under `name`
    async fn get(&self, name: &str) -> Result<String>;
}

/// Backend that shells out to a credstash-compatible CLI:
/// `<program> -r <region> get <name>`
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    region: Option<String>,
    table: Option<String>,
}

impl CommandBackend {
    #[must_use]
    pub fn new(region: Option<String>) -> Self {
        Self {
            program: DEFAULT_BACKEND_PROGRAM.to_string(),
            region,
            table: None,
        }
    }

    /// Use a different executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Read from a non-default credential table
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    fn args(&self, region: &str, name: &str) -> Vec<String> {
        let mut args = vec!["-r".to_string(), region.to_string()];
        if let Some(table) = &self.table {
            args.push("-t".to_string());
            args.push(table.clone());
        }
        args.push("get".to_string());
        args.push(name.to_string());
        args
    }
}

#[async_trait]
impl SecretBackend for CommandBackend {
    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn get(&self, name: &str) -> Result<String> {
        let region = self.region().ok_or_else(|| Error::missing_region(name))?;
        let args = self.args(region, name);

        tracing::debug!(program = %self.program, name, region, "fetching secret");
        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::secret_fetch_with_source(
                    name,
                    format!("failed to run '{}'", self.program),
                    e,
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::secret_fetch(
                name,
                format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        String::from_utf8(output.stdout)
            .map(|s| s.trim_end_matches(['\n', '\r']).to_string())
            .map_err(|e| Error::secret_fetch_with_source(name, "output is not valid UTF-8", e))
    }
}

/// In-memory backend for dry runs and tests
#[derive(Debug, Default)]
pub struct StaticBackend {
    region: Option<String>,
    secrets: HashMap<String, String>,
    failures: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl StaticBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `name: value` pairs from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).for_path(path, "read")?;
        let secrets: HashMap<String, String> = serde_yaml::from_str(&contents)
            .with_context(|| format!("secrets file {} must map names to values", path.display()))?;
        Ok(Self {
            secrets,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    /// Make `name` fail with `message`
    #[must_use]
    pub fn with_failure(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(name.into(), message.into());
        self
    }

    /// Sleep before answering, to exercise concurrency
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of `get` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `get` calls for `name`
    #[must_use]
    pub fn calls_for(&self, name: &str) -> usize {
        self.log.lock().iter().filter(|n| *n == name).count()
    }
}

#[async_trait]
impl SecretBackend for StaticBackend {
    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn get(&self, name: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(name.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failures.get(name) {
            return Err(Error::secret_fetch(name, message.clone()));
        }

        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::secret_fetch(name, "secret not found"))
    }
}
