//! Blocking bridge from synchronous initialization into async resolution.
//!
//! The bridge never spins. Outside a runtime it drives the future on a
//! private current-thread runtime, whose `block_on` parks on the I/O and
//! timer drivers until a wakeup arrives. Inside a multi-threaded runtime it
//! uses `block_in_place`, which hands the worker's queued tasks to another
//! thread before blocking, so the callbacks the future waits on keep running.
//! Inside a current-thread runtime there is no other thread to run those
//! callbacks; blocking there would deadlock, so the bridge refuses and the
//! caller must await the async entry point instead.
//!
//! Detection goes by runtime flavor only. A `spawn_blocking` thread of a
//! current-thread runtime is also reported as [`BridgeContext::CurrentThread`]
//! and refused, even though blocking there would be safe.

use deployenv_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Where a blocking call would land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeContext {
    /// No runtime on this thread
    Detached,
    /// Worker of a multi-threaded runtime
    MultiThread,
    /// Thread driving a current-thread runtime
    CurrentThread,
}

impl BridgeContext {
    #[must_use]
    pub fn detect() -> Self {
        match Handle::try_current() {
            Err(_) => BridgeContext::Detached,
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => BridgeContext::CurrentThread,
                _ => BridgeContext::MultiThread,
            },
        }
    }
}

/// Sync-over-async bridge with an optional bound on the wait
#[derive(Debug, Default)]
pub struct SyncBridge {
    runtime: Option<Runtime>,
    timeout: Option<Duration>,
}

impl SyncBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `timeout`, dropping the future and whatever it has in flight
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_or_create_runtime(&mut self) -> Result<&Runtime> {
        if self.runtime.is_none() {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    return Err(Error::configuration(format!(
                        "failed to create tokio runtime: {e}"
                    )));
                }
            };
            self.runtime = Some(runtime);
        }

        self.runtime.as_ref().ok_or_else(|| {
            Error::configuration("runtime unexpectedly missing after initialization")
        })
    }

    /// Block until `future` settles, returning its value or error
    pub fn block_on<F, T>(&mut self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let bounded = bounded(operation, self.timeout, future);
        match BridgeContext::detect() {
            BridgeContext::Detached => {
                tracing::debug!(operation, "blocking on private runtime");
                self.get_or_create_runtime()?.block_on(bounded)
            }
            BridgeContext::MultiThread => {
                tracing::debug!(operation, "blocking in place on runtime worker");
                let handle = Handle::current();
                tokio::task::block_in_place(|| handle.block_on(bounded))
            }
            BridgeContext::CurrentThread => Err(Error::configuration(format!(
                "cannot block on '{operation}' from a current-thread runtime; await the async entry point instead"
            ))),
        }
    }
}

/// Apply an optional timeout to `future`
pub async fn bounded<F, T>(operation: &str, timeout: Option<Duration>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation, limit)),
        },
        None => future.await,
    }
}

/// Helper function to run async code from sync context safely
pub fn run_blocking<F, T>(operation: &str, timeout: Option<Duration>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    SyncBridge::new().with_timeout(timeout).block_on(operation, future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_execution() -> Result<()> {
        assert_eq!(BridgeContext::detect(), BridgeContext::Detached);

        let value = run_blocking("answer", None, async { Ok::<i32, Error>(42) })?;
        assert_eq!(value, 42);

        Ok(())
    }

    #[tokio::test]
    async fn test_blocking_thread_of_current_thread_runtime_refused() {
        let (context, result) = tokio::task::spawn_blocking(|| {
            let result = run_blocking("nested", None, async { Ok::<i32, Error>(1) });
            (BridgeContext::detect(), result)
        })
        .await
        .unwrap();

        assert_eq!(context, BridgeContext::CurrentThread);
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_error_propagates() {
        let result: Result<()> = run_blocking("failing", None, async {
            Err(Error::secret_fetch("db", "denied"))
        });
        assert!(matches!(result, Err(Error::SecretFetch { .. })));
    }

    #[test]
    fn test_sleeping_future_completes() -> Result<()> {
        // The timer must fire while the caller is blocked
        let value = run_blocking("sleep", Some(Duration::from_secs(5)), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<&str, Error>("woke")
        })?;
        assert_eq!(value, "woke");
        Ok(())
    }

    #[test]
    fn test_timeout_cancels() {
        let result: Result<()> = run_blocking("slow", Some(Duration::from_millis(20)), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[test]
    fn test_bridge_reuses_runtime() -> Result<()> {
        let mut bridge = SyncBridge::new();
        assert_eq!(bridge.block_on("one", async { Ok::<_, Error>(1) })?, 1);
        assert_eq!(bridge.block_on("two", async { Ok::<_, Error>(2) })?, 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_multi_thread_blocks_in_place() {
        assert_eq!(BridgeContext::detect(), BridgeContext::MultiThread);

        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send("done");
        });

        let value = run_blocking("await spawned", Some(Duration::from_secs(5)), async {
            rx.await
                .map_err(|e| Error::configuration(format!("sender dropped: {e}")))
        })
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_current_thread_refuses() {
        assert_eq!(BridgeContext::detect(), BridgeContext::CurrentThread);

        let result = run_blocking("nested", None, async { Ok::<i32, Error>(1) });

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("current-thread runtime"));
        }
    }
}
