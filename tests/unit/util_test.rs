//! Tests for utility functions

use std::sync::Arc;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use prometheus_event_scheduler::util::{
    ClockType, ManualTimeSource, SystemTimeSource, TimeSource, Timestamp,
};

#[test]
fn test_timestamp_display() {
    let t = Timestamp::from_millis(1_500);
    assert_eq!(t.to_string(), "1.500000000s");
    assert_eq!(Timestamp::ZERO.to_string(), "0.000000000s");
}

#[test]
fn test_timestamp_ordering_and_conversion() {
    assert!(Timestamp::from_secs(1) < Timestamp::from_millis(1_001));
    assert_eq!(
        Timestamp::from_duration(Duration::from_secs(3)).as_duration(),
        Duration::from_secs(3)
    );
    let epoch_plus = UNIX_EPOCH + Duration::from_secs(42);
    assert_eq!(Timestamp::from(epoch_plus), Timestamp::from_secs(42));
}

#[test]
fn test_monotonic_source_never_goes_back() {
    let source = SystemTimeSource::new(ClockType::Monotonic);
    let mut last = source.now();
    for _ in 0..100 {
        let now = source.now();
        assert!(now >= last);
        last = now;
    }
    thread::sleep(Duration::from_millis(2));
    assert!(source.now() > last);
}

#[test]
fn test_manual_source_is_shared_between_threads() {
    let source = Arc::new(ManualTimeSource::new(Timestamp::from_secs(10)));
    let remote = Arc::clone(&source);
    thread::spawn(move || {
        remote.advance(Duration::from_secs(5));
    })
    .join()
    .unwrap();
    assert_eq!(source.now(), Timestamp::from_secs(15));

    source.set(Timestamp::from_secs(1));
    assert_eq!(source.now(), Timestamp::from_secs(1));
}

#[test]
fn test_clock_type_display() {
    assert_eq!(ClockType::default(), ClockType::Realtime);
    assert_eq!(ClockType::Monotonic.to_string(), "monotonic");
    assert_eq!(ClockType::Realtime.to_string(), "realtime");
}

#[test]
fn test_init_tracing_installs_once() {
    use prometheus_event_scheduler::util::{init_tracing, init_tracing_with_default};

    let _ = init_tracing();
    // A subscriber is now set, whoever installed it.
    assert!(!init_tracing_with_default("debug"));
    assert!(!init_tracing());
}
