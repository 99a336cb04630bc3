//! Configuration models for the scheduler and its dispatchers.

pub mod scheduler;
pub mod worker_pool;

pub use scheduler::{SchedulerConfig, ThreadConfig};
pub use worker_pool::WorkerPoolConfig;
