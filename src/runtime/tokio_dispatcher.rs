//! Tokio runtime dispatcher implementation.

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tracing::info;

use crate::core::dispatcher::{Dispatcher, Job};

/// Dispatcher that hands every job to a tokio runtime's blocking pool.
///
/// Callbacks are synchronous and may block, so they go through
/// `spawn_blocking` rather than onto the async worker threads.
#[derive(Clone, Debug)]
pub struct TokioDispatcher {
    handle: Handle,
    /// Keeps a runtime created by [`with_worker_threads`](Self::with_worker_threads) alive.
    _runtime: Option<Arc<Runtime>>,
}

impl TokioDispatcher {
    /// Create a dispatcher from an existing runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Create a dispatcher for the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Create a dispatcher owning a new multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// - `io::ErrorKind::InvalidInput` if `worker_threads` is zero
    /// - any error tokio reports while building the runtime
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        if worker_threads == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "worker_threads must be greater than 0",
            ));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("scheduler-tokio")
            .enable_all()
            .build()?;
        info!(worker_threads, "tokio dispatcher runtime created");
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Handle of the runtime jobs are sent to.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Dispatcher for TokioDispatcher {
    fn dispatch(&self, job: Job) {
        drop(self.handle.spawn_blocking(job));
    }
}
