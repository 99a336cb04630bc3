//! Core scheduling: handles, registries, the dispatcher loop and the
//! `Scheduler` facade.

mod dispatch_loop;
pub mod dispatcher;
pub mod due_time;
pub mod error;
pub mod handle;
mod registry;
pub mod scheduler;
pub mod test_time_source;
pub mod worker_pool;

pub use dispatcher::{DirectDispatcher, Dispatcher, Job};
pub use due_time::{DueKey, DueTimeCollection};
pub use error::{SchedulerError, SchedulerResult};
pub use handle::{ClockHandle, EventHandle, EventKey};
pub use scheduler::Scheduler;
pub use test_time_source::{TestTimeSource, TEST_TIME_OFFSET};
pub use worker_pool::{PoolError, PoolStats};
#[cfg(not(target_arch = "wasm32"))]
pub use worker_pool::WorkerPoolDispatcher;
