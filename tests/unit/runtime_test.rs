//! Tests for the tokio dispatcher

#![cfg(feature = "tokio-runtime")]

use std::time::Duration;

use prometheus_event_scheduler::core::Dispatcher;
use prometheus_event_scheduler::runtime::TokioDispatcher;
use prometheus_event_scheduler::Scheduler;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_dispatcher_runs_job() {
    let dispatcher = TokioDispatcher::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    dispatcher.dispatch(Box::new(move || {
        tx.send(123).unwrap();
    }));

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_with_tokio_dispatcher() {
    let scheduler = Scheduler::with_dispatcher(TokioDispatcher::current());
    scheduler.start().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler
        .schedule_event(scheduler.now() + Duration::from_millis(5), move || {
            let _ = tx.send(std::thread::current().name().map(str::to_owned));
        })
        .unwrap();

    let ran_on = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("event fired")
        .expect("sender kept");
    assert_ne!(ran_on.as_deref(), Some("event-scheduler"));

    tokio::task::spawn_blocking(move || scheduler.stop())
        .await
        .unwrap();
}

#[test]
fn test_tokio_dispatcher_with_owned_runtime() {
    let dispatcher = TokioDispatcher::with_worker_threads(1).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    dispatcher.dispatch(Box::new(move || tx.send(7).unwrap()));
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
}

#[test]
fn test_tokio_dispatcher_rejects_zero_worker_threads() {
    let err = TokioDispatcher::with_worker_threads(0).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}
