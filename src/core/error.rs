//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::handle::{ClockHandle, EventHandle};

/// Errors produced by scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The event is unknown, already dispatched, or was cancelled.
    #[error("{0} is not pending")]
    EventNotPending(EventHandle),
    /// The clock is unknown or was cancelled.
    #[error("{0} is not registered")]
    ClockNotRegistered(ClockHandle),
    /// A clock was started with a zero period.
    #[error("clock period must be greater than zero")]
    InvalidPeriod,
    /// A configured capacity limit was reached.
    #[error("capacity exceeded: {kind} limit of {limit} reached")]
    CapacityExceeded {
        /// Which registry is full ("event" or "clock").
        kind: &'static str,
        /// The configured limit.
        limit: usize,
    },
    /// The dispatcher thread could not be created.
    #[error("failed to spawn dispatcher thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
