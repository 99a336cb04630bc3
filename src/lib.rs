//! # Prometheus Event Scheduler
//!
//! A thread-safe timer scheduler for one-shot events and recurring clocks.
//!
//! Any number of producer threads register callbacks to fire at absolute
//! times. A single background dispatcher thread runs them in due-time order,
//! through a pluggable [`Dispatcher`](core::Dispatcher) that decides where
//! each callback executes.
//!
//! ## Guarantees
//!
//! - **No early fire**: an entry never runs before its due time.
//! - **Ordered dispatch**: due entries are selected in non-decreasing due-time
//!   order. Ties go to events before clocks, then to insertion order.
//! - **Linearizable cancellation**: `cancel_event(handle, true)` either
//!   prevents the callback from ever running, or fails after it has finished.
//! - **No backlog**: a clock that falls behind fires once and then continues
//!   one period after the moment it caught up.
//! - **No self-deadlock**: waiting operations called from inside a callback
//!   return immediately instead of waiting on themselves.
//!
//! ## Quick start
//!
//! ```rust
//! use prometheus_event_scheduler::Scheduler;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new();
//! scheduler.start().unwrap();
//!
//! let ticks = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&ticks);
//! let clock = scheduler
//!     .start_clock(Duration::from_millis(5), move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! std::thread::sleep(Duration::from_millis(30));
//! scheduler.cancel_clock(clock, true).unwrap();
//! scheduler.stop();
//! assert!(ticks.load(Ordering::SeqCst) >= 1);
//! ```
//!
//! ## Dispatchers
//!
//! By default callbacks run on the dispatcher thread itself. To keep a slow
//! callback from delaying the next one, hand them to a
//! [`WorkerPoolDispatcher`](core::WorkerPoolDispatcher) or, with the
//! `tokio-runtime` feature, a `TokioDispatcher`.
//!
//! ## Deterministic tests
//!
//! [`TestTimeSource`](core::TestTimeSource) freezes a scheduler's clock so
//! tests can step through time with `advance_time`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: handles, registries, the dispatcher loop and the facade.
pub mod core;
/// Configuration models for the scheduler and its dispatchers.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// In-memory due-time storage behind the registries.
pub mod infra;
/// Runtime adapters implementing `Dispatcher` on async runtimes.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::SchedulerBuilder;
pub use crate::config::{SchedulerConfig, ThreadConfig};
pub use crate::core::{
    ClockHandle, Dispatcher, EventHandle, EventKey, Scheduler, SchedulerError, SchedulerResult,
    TestTimeSource,
};
pub use crate::util::clock::{ClockType, Timestamp};
