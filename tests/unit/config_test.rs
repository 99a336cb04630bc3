//! Tests for configuration validation and loading

use std::collections::HashMap;

use prometheus_event_scheduler::config::{SchedulerConfig, ThreadConfig, WorkerPoolConfig};
use prometheus_event_scheduler::util::ClockType;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_scheduler_config_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.clock_type, ClockType::Realtime);
    assert_eq!(cfg.max_events, None);
    assert_eq!(cfg.max_clocks, None);
    assert_eq!(cfg.thread.name, "event-scheduler");
    assert_eq!(cfg.thread.stack_size, None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_zero_limits_rejected() {
    assert!(SchedulerConfig::new().with_max_events(0).validate().is_err());
    assert!(SchedulerConfig::new().with_max_clocks(0).validate().is_err());
    assert!(SchedulerConfig::new()
        .with_max_events(1)
        .with_max_clocks(1)
        .validate()
        .is_ok());
}

#[test]
fn test_thread_config_validation() {
    assert!(ThreadConfig::default().with_name("").validate().is_err());
    assert!(ThreadConfig::default().with_name("a\0b").validate().is_err());
    assert!(ThreadConfig::default().with_stack_size(0).validate().is_err());
    assert!(ThreadConfig::default()
        .with_name("timer")
        .with_stack_size(256 * 1024)
        .validate()
        .is_ok());

    let err = SchedulerConfig::new()
        .with_thread(ThreadConfig::default().with_name(""))
        .validate()
        .unwrap_err();
    assert!(err.starts_with("thread invalid"), "{err}");
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "clock_type": "monotonic",
        "max_events": 100,
        "thread": { "name": "timers", "stack_size": 131072 }
    }"#;
    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.clock_type, ClockType::Monotonic);
    assert_eq!(cfg.max_events, Some(100));
    assert_eq!(cfg.max_clocks, None);
    assert_eq!(cfg.thread.name, "timers");
    assert_eq!(cfg.thread.stack_size, Some(131_072));
}

#[test]
fn test_scheduler_config_from_json_errors() {
    let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"), "{err}");

    let err = SchedulerConfig::from_json_str(r#"{ "max_clocks": 0 }"#).unwrap_err();
    assert!(err.contains("max_clocks"), "{err}");

    assert!(SchedulerConfig::from_json_str(r#"{ "clock_type": "lunar" }"#).is_err());
}

#[test]
fn test_scheduler_config_json_roundtrip() {
    let cfg = SchedulerConfig::new()
        .with_clock_type(ClockType::Monotonic)
        .with_max_clocks(8);
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_scheduler_config_from_lookup() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("EVENT_SCHEDULER_CLOCK_TYPE", "Monotonic"),
        ("EVENT_SCHEDULER_MAX_EVENTS", " 64 "),
        ("EVENT_SCHEDULER_THREAD_NAME", "env-timer"),
        ("EVENT_SCHEDULER_THREAD_STACK_SIZE", "65536"),
    ]))
    .unwrap();
    assert_eq!(cfg.clock_type, ClockType::Monotonic);
    assert_eq!(cfg.max_events, Some(64));
    assert_eq!(cfg.max_clocks, None);
    assert_eq!(cfg.thread.name, "env-timer");
    assert_eq!(cfg.thread.stack_size, Some(65_536));
}

#[test]
fn test_scheduler_config_from_lookup_empty_is_default() {
    let cfg = SchedulerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_scheduler_config_from_lookup_errors() {
    let err = SchedulerConfig::from_lookup(lookup(&[("EVENT_SCHEDULER_CLOCK_TYPE", "lunar")]))
        .unwrap_err();
    assert!(err.contains("lunar"), "{err}");

    let err = SchedulerConfig::from_lookup(lookup(&[("EVENT_SCHEDULER_MAX_CLOCKS", "many")]))
        .unwrap_err();
    assert!(err.starts_with("EVENT_SCHEDULER_MAX_CLOCKS"), "{err}");

    assert!(SchedulerConfig::from_lookup(lookup(&[("EVENT_SCHEDULER_MAX_EVENTS", "0")])).is_err());
}

#[test]
fn test_worker_pool_config_validation() {
    let valid = WorkerPoolConfig::new()
        .with_worker_count(4)
        .with_max_queue_depth(50)
        .with_thread_stack_size(1024 * 1024)
        .with_thread_name_prefix("cb");
    assert!(valid.validate().is_ok());
    assert_eq!(valid.thread_name_prefix, "cb");

    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_max_queue_depth(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(0).validate().is_err());
}

#[test]
fn test_worker_pool_config_default_uses_cpus() {
    let cfg = WorkerPoolConfig::default();
    assert!(cfg.worker_count >= 1);
    assert!(cfg.validate().is_ok());
}
