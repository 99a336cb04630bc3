//! Tests for error types

use std::error::Error as _;
use std::io;

use prometheus_event_scheduler::core::{PoolError, SchedulerError};
use prometheus_event_scheduler::Scheduler;

#[test]
fn test_scheduler_error_display() {
    assert_eq!(
        SchedulerError::InvalidPeriod.to_string(),
        "clock period must be greater than zero"
    );
    assert_eq!(
        SchedulerError::CapacityExceeded {
            kind: "event",
            limit: 3
        }
        .to_string(),
        "capacity exceeded: event limit of 3 reached"
    );
    assert_eq!(
        SchedulerError::InvalidConfig("max_events must be greater than 0".into()).to_string(),
        "invalid configuration: max_events must be greater than 0"
    );
}

#[test]
fn test_handle_errors_name_the_handle() {
    let scheduler = Scheduler::new();
    let event = scheduler.schedule_event(scheduler.now(), || {}).unwrap();
    scheduler.cancel_event(event, false).unwrap();

    let err = scheduler.cancel_event(event, false).unwrap_err();
    assert!(matches!(err, SchedulerError::EventNotPending(h) if h == event));
    assert_eq!(err.to_string(), format!("{event} is not pending"));
    assert!(err.to_string().starts_with("event#"));

    let clock = scheduler
        .start_clock(std::time::Duration::from_secs(1), || {})
        .unwrap();
    scheduler.cancel_clock(clock, false).unwrap();
    let err = scheduler.cancel_clock(clock, false).unwrap_err();
    assert!(err.to_string().starts_with("clock#"));
}

#[test]
fn test_thread_spawn_error_has_source() {
    let err = SchedulerError::ThreadSpawn(io::Error::other("no threads left"));
    assert!(err.to_string().contains("no threads left"));
    assert!(err.source().is_some());
}

#[test]
fn test_pool_error_display() {
    assert_eq!(PoolError::QueueFull.to_string(), "job queue is full");
    assert_eq!(PoolError::PoolShutdown.to_string(), "pool has been shut down");
    let err = PoolError::Spawn(io::Error::other("denied"));
    assert!(err.source().is_some());
}
