//! Task spawning for submitted commands.
//!
//! Commands are spawned onto the caller's tokio runtime when there is one.
//! Outside a runtime they go to a lazily built, process-wide multi-threaded
//! runtime instead, so direct calls can be issued from synchronous code.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{RedsetError, Result};

/// Environment variable overriding the fallback runtime's worker count.
pub const THREADS_ENV_VAR: &str = "REDSET_RUNTIME_THREADS";

static RUNTIME: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();

/// The fallback runtime, built on first use.
pub fn get_runtime() -> Result<&'static Runtime> {
    RUNTIME
        .get_or_init(|| {
            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.enable_all().thread_name("redset-rt");

            if let Some(n) = std::env::var(THREADS_ENV_VAR)
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&n| n > 0)
            {
                builder.worker_threads(n);
            }

            builder.build().map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| {
            RedsetError::Connection(std::io::Error::other(format!(
                "failed to create tokio runtime: {e}"
            )))
        })
}

/// Spawn on the current runtime, or on the fallback one outside of tokio.
pub fn spawn<F>(future: F) -> Result<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Ok(handle.spawn(future)),
        Err(_) => Ok(get_runtime()?.spawn(future)),
    }
}

// ── Tests ──────────────────────────────────────────────────────────
