//! Tests for the scheduler builder

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_event_scheduler::builders::SchedulerBuilder;
use prometheus_event_scheduler::config::{SchedulerConfig, ThreadConfig};
use prometheus_event_scheduler::core::{Job, SchedulerError};
use prometheus_event_scheduler::util::{ClockType, ManualTimeSource, Timestamp};

#[test]
fn test_build_with_defaults() {
    let scheduler = SchedulerBuilder::default().build().unwrap();
    assert_eq!(scheduler.clock_type(), ClockType::Realtime);
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.num_events(), 0);
    assert_eq!(scheduler.num_clocks(), 0);
}

#[test]
fn test_build_rejects_invalid_config() {
    let result = SchedulerBuilder::new(SchedulerConfig::new().with_max_events(0)).build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));

    let result = SchedulerBuilder::new(
        SchedulerConfig::new().with_thread(ThreadConfig::default().with_name("")),
    )
    .build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_build_with_time_source() {
    let source = Arc::new(ManualTimeSource::new(Timestamp::from_secs(500)));
    let scheduler = SchedulerBuilder::new(SchedulerConfig::new())
        .with_time_source(source.clone())
        .build()
        .unwrap();
    assert_eq!(scheduler.now(), Timestamp::from_secs(500));
    source.advance(Duration::from_secs(1));
    assert_eq!(scheduler.now(), Timestamp::from_secs(501));
}

#[test]
fn test_build_monotonic_clock() {
    let scheduler =
        SchedulerBuilder::new(SchedulerConfig::new().with_clock_type(ClockType::Monotonic))
            .build()
            .unwrap();
    assert_eq!(scheduler.clock_type(), ClockType::Monotonic);
    // Monotonic time counts from process start, far below wall-clock time.
    assert!(scheduler.now() < Timestamp::from_secs(1_000_000_000));
}

#[test]
fn test_build_with_dispatcher() {
    let dispatched = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dispatched);
    let scheduler = SchedulerBuilder::new(SchedulerConfig::new())
        .with_dispatcher(move |job: Job| {
            counter.fetch_add(1, Ordering::SeqCst);
            job();
        })
        .build()
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    scheduler
        .schedule_event(scheduler.now(), move || tx.send(()).unwrap())
        .unwrap();
    scheduler.start().unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    scheduler.stop();
    assert_eq!(dispatched.load(Ordering::SeqCst), 1);
}

#[test]
fn test_config_reaches_scheduler() {
    let scheduler = SchedulerBuilder::new(
        SchedulerConfig::new()
            .with_max_clocks(2)
            .with_thread(ThreadConfig::default().with_name("built-timer")),
    )
    .build()
    .unwrap();
    assert_eq!(scheduler.config().max_clocks, Some(2));
    assert_eq!(scheduler.config().thread.name, "built-timer");
}
