//! Native implementation of `WorkerPoolDispatcher` using OS threads.
//!
//! Workers block on a bounded crossbeam channel. Dropping the sender is the
//! shutdown signal: every worker drains what is already queued, sees the
//! channel disconnect and exits.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::dispatcher::{panic_message, Dispatcher, Job};

use super::{PoolCounters, PoolError, PoolStats};

struct Inner {
    config: WorkerPoolConfig,
    /// `None` once shut down.
    job_tx: Mutex<Option<Sender<Job>>>,
    counters: Arc<PoolCounters>,
    shutdown: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// [`Dispatcher`] backed by a fixed set of worker threads.
///
/// Cloning is cheap; clones share the same pool. `dispatch` blocks while the
/// queue is full. After [`shutdown`](Self::shutdown), jobs are run on the
/// calling thread instead of being lost.
///
/// Dropping the last clone disconnects the queue; workers finish what is
/// queued and exit without being joined.
#[derive(Clone)]
pub struct WorkerPoolDispatcher {
    inner: Arc<Inner>,
}

impl WorkerPoolDispatcher {
    /// Create a pool and spawn `config.worker_count` worker threads.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker thread cannot be created
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (job_tx, job_rx) = bounded::<Job>(config.max_queue_depth);
        let counters = Arc::new(PoolCounters::default());

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            match spawn_worker(worker_id, job_rx.clone(), Arc::clone(&counters), &config) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    // Disconnect the channel so already spawned workers exit.
                    drop(job_tx);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = config.max_queue_depth,
            "worker pool dispatcher initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                job_tx: Mutex::new(Some(job_tx)),
                counters,
                shutdown: AtomicBool::new(false),
                workers: Mutex::new(workers),
            }),
        })
    }

    fn sender(&self) -> Result<Sender<Job>, PoolError> {
        self.inner
            .job_tx
            .lock()
            .as_ref()
            .cloned()
            .ok_or(PoolError::PoolShutdown)
    }

    /// Queue `job`, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// `PoolError::PoolShutdown` if the pool has been shut down. The job is
    /// handed back alongside the error.
    pub fn submit(&self, job: Job) -> Result<(), (PoolError, Job)> {
        let tx = match self.sender() {
            Ok(tx) => tx,
            Err(err) => return Err((err, job)),
        };
        self.inner.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        match tx.send(job) {
            Ok(()) => {
                self.inner.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.inner.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                Err((PoolError::PoolShutdown, err.into_inner()))
            }
        }
    }

    /// Queue `job` without waiting.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn try_submit(&self, job: Job) -> Result<(), PoolError> {
        let tx = self.sender()?;
        self.inner.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        match tx.try_send(job) {
            Ok(()) => {
                self.inner.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.inner.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                match err {
                    TrySendError::Full(_) => Err(PoolError::QueueFull),
                    TrySendError::Disconnected(_) => Err(PoolError::PoolShutdown),
                }
            }
        }
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.counters.snapshot(self.inner.config.worker_count)
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting jobs, let workers finish everything already queued and
    /// join them. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down worker pool dispatcher");
        self.inner.job_tx.lock().take();

        let workers: Vec<_> = self.inner.workers.lock().drain(..).collect();
        let worker_count = workers.len();
        let current = thread::current().id();
        for (worker_id, worker) in workers.into_iter().enumerate() {
            // A job calling shutdown cannot join its own thread.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!(worker_id, "worker thread panicked");
            }
        }
        info!(worker_count, "worker pool dispatcher shut down");
    }
}

impl Dispatcher for WorkerPoolDispatcher {
    fn dispatch(&self, job: Job) {
        if let Err((err, job)) = self.submit(job) {
            self.inner.counters.rejected_jobs.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "running job on dispatcher thread");
            job();
        }
    }
}

fn spawn_worker(
    worker_id: usize,
    job_rx: Receiver<Job>,
    counters: Arc<PoolCounters>,
    config: &WorkerPoolConfig,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            debug!(worker_id, "worker thread started");
            // Exits once the sender is dropped and the queue is drained.
            for job in &job_rx {
                counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                counters.active_jobs.fetch_add(1, Ordering::Relaxed);

                match panic::catch_unwind(AssertUnwindSafe(job)) {
                    Ok(()) => {
                        counters.completed_jobs.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(payload) => {
                        counters.panicked_jobs.fetch_add(1, Ordering::Relaxed);
                        error!(
                            worker_id,
                            panic = %panic_message(payload.as_ref()),
                            "job panicked"
                        );
                    }
                }

                counters.active_jobs.fetch_sub(1, Ordering::Relaxed);
            }
            debug!(worker_id, "worker thread exiting");
        })
}
