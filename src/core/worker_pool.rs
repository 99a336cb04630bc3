//! Dispatcher that runs callbacks on a pool of dedicated OS threads.
//!
//! The scheduler's dispatcher thread only hands each job to the pool, so a
//! slow callback no longer delays the ones due after it. Selection order is
//! unchanged; with more than one worker, completion order is not.
//!
//! # Example
//!
//! ```rust
//! use prometheus_event_scheduler::config::WorkerPoolConfig;
//! use prometheus_event_scheduler::core::WorkerPoolDispatcher;
//! use prometheus_event_scheduler::Scheduler;
//!
//! let pool = WorkerPoolDispatcher::new(WorkerPoolConfig::new().with_worker_count(2)).unwrap();
//! let scheduler = Scheduler::with_dispatcher(pool.clone());
//! scheduler.start().unwrap();
//! scheduler.stop();
//! pool.shutdown();
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod native;

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Errors that can occur when using a `WorkerPoolDispatcher`.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The job queue is full; `try_submit` does not wait.
    #[error("job queue is full")]
    QueueFull,
    /// The pool has been shut down.
    #[error("pool has been shut down")]
    PoolShutdown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be created.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs currently executing.
    pub active_jobs: u64,
    /// Jobs waiting in the queue.
    pub queued_jobs: u64,
    /// Jobs that returned normally.
    pub completed_jobs: u64,
    /// Jobs that panicked.
    pub panicked_jobs: u64,
    /// Jobs accepted by the pool.
    pub submitted_jobs: u64,
    /// Jobs run on the caller because the pool was shut down.
    pub rejected_jobs: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_jobs: AtomicU64,
    pub queued_jobs: AtomicU64,
    pub completed_jobs: AtomicU64,
    pub panicked_jobs: AtomicU64,
    pub submitted_jobs: AtomicU64,
    pub rejected_jobs: AtomicU64,
}

impl PoolCounters {
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            queued_jobs: self.queued_jobs.load(Ordering::Relaxed),
            completed_jobs: self.completed_jobs.load(Ordering::Relaxed),
            panicked_jobs: self.panicked_jobs.load(Ordering::Relaxed),
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
            rejected_jobs: self.rejected_jobs.load(Ordering::Relaxed),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::WorkerPoolDispatcher;
