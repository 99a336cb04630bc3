//! Public scheduler facade and the state it shares with the dispatcher loop.
//!
//! One mutex guards both registries together with the in-flight marker. Two
//! condition variables hang off that mutex: `wake` interrupts the dispatcher
//! while it is idle, and `settled` is broadcast every time the dispatcher
//! finishes invoking an entry so that `wait`-ing callers can re-check the
//! in-flight marker.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, trace};

use crate::config::{SchedulerConfig, ThreadConfig};
use crate::core::dispatch_loop;
use crate::core::dispatcher::{DirectDispatcher, Dispatcher};
use crate::core::error::{SchedulerError, SchedulerResult};
use crate::core::handle::{ClockHandle, EventHandle, EventKey};
use crate::core::registry::{ClockRegistry, EventRegistry};
use crate::util::clock::{ClockType, SystemTimeSource, TimeSource, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    Stopped,
    Running,
    /// Asked to exit; the loop leaves after the current invocation.
    Stopping,
}

/// The entry the dispatcher is currently invoking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryRef {
    Event(EventHandle),
    Clock(ClockHandle),
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(handle) => fmt::Display::fmt(handle, f),
            Self::Clock(handle) => fmt::Display::fmt(handle, f),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InFlight {
    pub(crate) entry: EntryRef,
    /// Distinguishes successive invocations of the same clock.
    pub(crate) seq: u64,
}

pub(crate) struct State {
    pub(crate) events: EventRegistry,
    pub(crate) clocks: ClockRegistry,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) dispatch_seq: u64,
    pub(crate) run_state: RunState,
    pub(crate) dispatcher_thread: Option<ThreadId>,
    /// Due time the idle dispatcher is sleeping towards. `None` while it is
    /// busy or sleeping without a deadline.
    pub(crate) wake_target: Option<Timestamp>,
}

impl State {
    fn new() -> Self {
        Self {
            events: EventRegistry::default(),
            clocks: ClockRegistry::default(),
            in_flight: None,
            dispatch_seq: 0,
            run_state: RunState::Stopped,
            dispatcher_thread: None,
            wake_target: None,
        }
    }

    fn on_dispatcher_thread(&self) -> bool {
        self.dispatcher_thread == Some(thread::current().id())
    }
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    pub(crate) wake: Condvar,
    pub(crate) settled: Condvar,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    time_source: RwLock<Arc<dyn TimeSource>>,
    config: SchedulerConfig,
}

impl Shared {
    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.read().now()
    }

    pub(crate) fn set_time_source(&self, source: Arc<dyn TimeSource>) {
        *self.time_source.write() = source;
    }

    /// Force the dispatcher to re-read the time and re-select.
    pub(crate) fn wake_dispatcher(&self) {
        // Notify under the lock so a dispatcher between reading the time and
        // parking cannot miss it.
        let _state = self.state.lock();
        self.wake.notify_all();
    }

    fn notify_if_earlier(&self, state: &State, due: Timestamp) {
        if state.run_state == RunState::Running && state.wake_target.is_none_or(|target| due < target)
        {
            self.wake.notify_one();
        }
    }

    fn notify_if_wake_target(&self, state: &State, due: Timestamp) {
        if state.wake_target == Some(due) {
            self.wake.notify_one();
        }
    }

    /// Block until the dispatcher has finished the in-flight entry, if that
    /// entry satisfies `matches`. Returns at once on the dispatcher thread.
    fn wait_in_flight(&self, state: &mut MutexGuard<'_, State>, matches: impl Fn(EntryRef) -> bool) {
        if state.on_dispatcher_thread() {
            return;
        }
        let Some(seq) = state
            .in_flight
            .filter(|in_flight| matches(in_flight.entry))
            .map(|in_flight| in_flight.seq)
        else {
            return;
        };
        while state.in_flight.is_some_and(|in_flight| in_flight.seq == seq) {
            self.settled.wait(state);
        }
    }
}

/// Thread-safe scheduler of one-shot events and recurring clocks.
///
/// Callbacks are invoked in due-time order on a single background dispatcher
/// thread (through the configured [`Dispatcher`]). Entries may be registered
/// before [`start`](Self::start) and survive [`stop`](Self::stop).
///
/// ```rust
/// use prometheus_event_scheduler::Scheduler;
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new();
/// scheduler.start().unwrap();
/// let handle = scheduler
///     .schedule_event(scheduler.now() + Duration::from_secs(60), || println!("late"))
///     .unwrap();
/// scheduler.cancel_event(handle, true).unwrap();
/// scheduler.stop();
/// ```
pub struct Scheduler {
    pub(crate) shared: Arc<Shared>,
    /// Dispatcher thread handle. Held across start and stop, which serialises
    /// lifecycle changes.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a stopped scheduler on the realtime clock that invokes callbacks
    /// directly on the dispatcher thread.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            SchedulerConfig::default(),
            Arc::new(DirectDispatcher),
            Arc::new(SystemTimeSource::new(ClockType::Realtime)),
        )
    }

    /// Create a stopped scheduler that invokes callbacks through `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(dispatcher: impl Dispatcher) -> Self {
        Self::from_parts(
            SchedulerConfig::default(),
            Arc::new(dispatcher),
            Arc::new(SystemTimeSource::new(ClockType::Realtime)),
        )
    }

    /// Create a stopped scheduler from a validated configuration.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if `config` fails validation.
    pub fn with_config(config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let time_source = Arc::new(SystemTimeSource::new(config.clock_type));
        Ok(Self::from_parts(config, Arc::new(DirectDispatcher), time_source))
    }

    pub(crate) fn from_parts(
        config: SchedulerConfig,
        dispatcher: Arc<dyn Dispatcher>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        debug!(clock_type = %config.clock_type, "scheduler created");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::new()),
                wake: Condvar::new(),
                settled: Condvar::new(),
                dispatcher,
                time_source: RwLock::new(time_source),
                config,
            }),
            worker: Mutex::new(None),
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Schedule `callback` to run once at `due`, under the default key.
    ///
    /// # Errors
    ///
    /// `SchedulerError::CapacityExceeded` if `max_events` events are pending.
    pub fn schedule_event<F>(&self, due: Timestamp, callback: F) -> SchedulerResult<EventHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_event_with_key(due, EventKey::default(), callback)
    }

    /// Schedule `callback` to run once at `due`, tagged with `key`.
    ///
    /// A `due` in the past is allowed; the event fires as soon as the
    /// dispatcher runs.
    ///
    /// # Errors
    ///
    /// `SchedulerError::CapacityExceeded` if `max_events` events are pending.
    pub fn schedule_event_with_key<F>(
        &self,
        due: Timestamp,
        key: EventKey,
        callback: F,
    ) -> SchedulerResult<EventHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if let Some(limit) = self
            .shared
            .config
            .max_events
            .filter(|&limit| state.events.len() >= limit)
        {
            return Err(SchedulerError::CapacityExceeded {
                kind: "event",
                limit,
            });
        }
        let handle = state.events.insert(due, key, Box::new(callback));
        self.shared.notify_if_earlier(&state, due);
        trace!(%handle, %due, key = key.value(), "event scheduled");
        Ok(handle)
    }

    /// Move a pending default-key event to `new_time`.
    ///
    /// # Errors
    ///
    /// `SchedulerError::EventNotPending` if the event is no longer pending.
    pub fn reschedule_event(
        &self,
        handle: EventHandle,
        new_time: Timestamp,
        wait: bool,
    ) -> SchedulerResult<()> {
        self.reschedule_event_with_key(handle, EventKey::default(), new_time, wait)
    }

    /// Move a pending event to `new_time`.
    ///
    /// Fails if the event is unknown, was scheduled under a different key, has
    /// already been dispatched, or is being dispatched right now. With `wait`,
    /// a failing call returns only once the dispatcher has finished with the
    /// event.
    ///
    /// # Errors
    ///
    /// `SchedulerError::EventNotPending` if the event is no longer pending
    /// under `key`.
    pub fn reschedule_event_with_key(
        &self,
        handle: EventHandle,
        key: EventKey,
        new_time: Timestamp,
        wait: bool,
    ) -> SchedulerResult<()> {
        let mut state = self.shared.state.lock();
        if state.events.reschedule(handle, key, new_time) {
            self.shared.notify_if_earlier(&state, new_time);
            trace!(%handle, due = %new_time, "event rescheduled");
            return Ok(());
        }
        if wait {
            self.shared
                .wait_in_flight(&mut state, |entry| entry == EntryRef::Event(handle));
        }
        Err(SchedulerError::EventNotPending(handle))
    }

    /// Cancel a pending default-key event.
    ///
    /// # Errors
    ///
    /// `SchedulerError::EventNotPending` if the event is no longer pending.
    pub fn cancel_event(&self, handle: EventHandle, wait: bool) -> SchedulerResult<()> {
        self.cancel_event_with_key(handle, EventKey::default(), wait)
    }

    /// Cancel a pending event.
    ///
    /// On success the callback will never run. If the callback has already
    /// started, the call fails; with `wait` it fails only after the callback
    /// has returned.
    ///
    /// # Errors
    ///
    /// `SchedulerError::EventNotPending` if the event is no longer pending
    /// under `key`.
    pub fn cancel_event_with_key(
        &self,
        handle: EventHandle,
        key: EventKey,
        wait: bool,
    ) -> SchedulerResult<()> {
        let mut state = self.shared.state.lock();
        let removed = state.events.remove(handle, key);
        if let Some((due, entry)) = removed {
            self.shared.notify_if_wake_target(&state, due);
            drop(state);
            drop(entry);
            trace!(%handle, "event cancelled");
            return Ok(());
        }
        if wait {
            self.shared
                .wait_in_flight(&mut state, |entry| entry == EntryRef::Event(handle));
        }
        Err(SchedulerError::EventNotPending(handle))
    }

    /// Cancel every pending event. With `wait`, also waits for an event that
    /// is being dispatched.
    pub fn cancel_all_events(&self, wait: bool) {
        let mut state = self.shared.state.lock();
        let drained = state.events.drain();
        if !drained.is_empty() {
            self.shared.wake.notify_one();
        }
        if wait {
            self.shared
                .wait_in_flight(&mut state, |entry| matches!(entry, EntryRef::Event(_)));
        }
        drop(state);
        debug!(cancelled = drained.len(), "all events cancelled");
        drop(drained);
    }

    // ========================================================================
    // Clocks
    // ========================================================================

    /// Start a clock that first fires one `period` from now.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidPeriod` if `period` is zero
    /// - `SchedulerError::CapacityExceeded` if `max_clocks` clocks are registered
    pub fn start_clock<F>(&self, period: Duration, callback: F) -> SchedulerResult<ClockHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let start = self.now() + period;
        self.start_clock_at(period, start, callback)
    }

    /// Start a clock that first fires at `start` and then every `period`.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidPeriod` if `period` is zero
    /// - `SchedulerError::CapacityExceeded` if `max_clocks` clocks are registered
    pub fn start_clock_at<F>(
        &self,
        period: Duration,
        start: Timestamp,
        callback: F,
    ) -> SchedulerResult<ClockHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(SchedulerError::InvalidPeriod);
        }
        let mut state = self.shared.state.lock();
        if let Some(limit) = self
            .shared
            .config
            .max_clocks
            .filter(|&limit| state.clocks.len() >= limit)
        {
            return Err(SchedulerError::CapacityExceeded {
                kind: "clock",
                limit,
            });
        }
        let handle = state.clocks.insert(start, period, Arc::new(callback));
        self.shared.notify_if_earlier(&state, start);
        trace!(%handle, %start, ?period, "clock started");
        Ok(handle)
    }

    /// Cancel a clock.
    ///
    /// A clock stays registered while its callback runs, so cancelling it from
    /// another thread mid-invocation succeeds. With `wait`, the call then
    /// returns only after that invocation has finished.
    ///
    /// # Errors
    ///
    /// `SchedulerError::ClockNotRegistered` if the clock was already cancelled.
    pub fn cancel_clock(&self, handle: ClockHandle, wait: bool) -> SchedulerResult<()> {
        let mut state = self.shared.state.lock();
        let removed = state.clocks.remove(handle);
        if let Some((due, _)) = &removed {
            self.shared.notify_if_wake_target(&state, *due);
        }
        if wait {
            self.shared
                .wait_in_flight(&mut state, |entry| entry == EntryRef::Clock(handle));
        }
        drop(state);
        match removed {
            Some(_) => {
                trace!(%handle, "clock cancelled");
                Ok(())
            }
            None => Err(SchedulerError::ClockNotRegistered(handle)),
        }
    }

    /// Cancel every clock. With `wait`, also waits for a clock that is being
    /// dispatched.
    pub fn cancel_all_clocks(&self, wait: bool) {
        let mut state = self.shared.state.lock();
        let drained = state.clocks.drain();
        if !drained.is_empty() {
            self.shared.wake.notify_one();
        }
        if wait {
            self.shared
                .wait_in_flight(&mut state, |entry| matches!(entry, EntryRef::Clock(_)));
        }
        drop(state);
        debug!(cancelled = drained.len(), "all clocks cancelled");
        drop(drained);
    }

    /// Next due time of a registered clock.
    #[must_use]
    pub fn clock_next_due(&self, handle: ClockHandle) -> Option<Timestamp> {
        self.shared.state.lock().clocks.next_due(handle)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the dispatcher thread with the configured thread attributes.
    ///
    /// # Errors
    ///
    /// See [`start_with`](Self::start_with).
    pub fn start(&self) -> SchedulerResult<()> {
        let thread_config = self.shared.config.thread.clone();
        self.start_with(&thread_config)
    }

    /// Start the dispatcher thread with explicit thread attributes.
    ///
    /// Does nothing if the scheduler is already running, or when called from
    /// the dispatcher thread itself.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if `thread_config` fails validation
    /// - `SchedulerError::ThreadSpawn` if the thread cannot be created
    pub fn start_with(&self, thread_config: &ThreadConfig) -> SchedulerResult<()> {
        thread_config.validate().map_err(SchedulerError::InvalidConfig)?;
        if self.shared.state.lock().on_dispatcher_thread() {
            return Ok(());
        }

        let mut worker = self.worker.lock();
        if self.shared.state.lock().run_state == RunState::Running {
            return Ok(());
        }
        // A loop asked to stop from its own thread may still be finishing.
        if let Some(previous) = worker.take() {
            join_dispatcher(previous);
        }

        let mut state = self.shared.state.lock();
        state.run_state = RunState::Running;
        let shared = Arc::clone(&self.shared);
        let mut builder = thread::Builder::new().name(thread_config.name.clone());
        if let Some(stack_size) = thread_config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        match builder.spawn(move || dispatch_loop::run(&shared)) {
            Ok(handle) => {
                drop(state);
                *worker = Some(handle);
                info!(thread = %thread_config.name, "scheduler started");
                Ok(())
            }
            Err(err) => {
                state.run_state = RunState::Stopped;
                error!(thread = %thread_config.name, error = %err, "failed to spawn dispatcher thread");
                Err(SchedulerError::ThreadSpawn(err))
            }
        }
    }

    /// Stop the dispatcher thread and wait for it to exit.
    ///
    /// A callback in progress runs to completion first. Pending events and
    /// clocks are kept. Called from the dispatcher thread, this only asks the
    /// loop to exit once the current callback returns.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.on_dispatcher_thread() {
                if state.run_state == RunState::Running {
                    state.run_state = RunState::Stopping;
                    debug!("stop requested from dispatcher thread");
                }
                return;
            }
        }

        let mut worker = self.worker.lock();
        {
            let mut state = self.shared.state.lock();
            if state.run_state == RunState::Running {
                state.run_state = RunState::Stopping;
                self.shared.wake.notify_all();
            }
        }
        if let Some(handle) = worker.take() {
            join_dispatcher(handle);
            info!("scheduler stopped");
        }
    }

    /// True between a successful `start` and the next `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().run_state == RunState::Running
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Number of pending events.
    #[must_use]
    pub fn num_events(&self) -> usize {
        self.shared.state.lock().events.len()
    }

    /// Number of registered clocks.
    #[must_use]
    pub fn num_clocks(&self) -> usize {
        self.shared.state.lock().clocks.len()
    }

    /// Current time as seen by this scheduler.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.shared.now()
    }

    /// Clock that due times are measured against.
    #[must_use]
    pub fn clock_type(&self) -> ClockType {
        self.shared.config.clock_type
    }

    /// The configuration this scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Scheduler")
            .field("run_state", &state.run_state)
            .field("events", &state.events.len())
            .field("clocks", &state.clocks.len())
            .field("clock_type", &self.shared.config.clock_type)
            .finish_non_exhaustive()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_dispatcher(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("dispatcher thread panicked");
    }
}
