//! Worker pool dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Default stack size for worker threads (2 MiB).
pub const DEFAULT_WORKER_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Configuration for `WorkerPoolDispatcher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs that may wait for a free worker before dispatch blocks.
    pub max_queue_depth: usize,
    /// Stack size of each worker thread in bytes.
    pub thread_stack_size: usize,
    /// Worker thread names are `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            max_queue_depth: 1024,
            thread_stack_size: DEFAULT_WORKER_STACK_SIZE,
            thread_name_prefix: "scheduler-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    /// Create the default configuration (one worker per logical CPU).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the job queue depth.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Describes the first zero-valued setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }
}
