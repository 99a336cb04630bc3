//! Body of the dispatcher thread.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use parking_lot::MutexGuard;
use tracing::{debug, error, trace};

use crate::core::dispatcher::{panic_message, Job};
use crate::core::scheduler::{EntryRef, InFlight, RunState, Shared, State};
use crate::util::clock::Timestamp;

enum Selection {
    /// Entry removed (or rearmed) and ready to invoke.
    Fire(EntryRef, Job),
    /// Earliest entry is due at the given time.
    WaitUntil(Timestamp),
    /// Both registries are empty.
    Idle,
}

/// Run the dispatcher loop until the scheduler leaves the running state.
pub(crate) fn run(shared: &Shared) {
    let mut state = shared.state.lock();
    state.dispatcher_thread = Some(thread::current().id());
    debug!("dispatcher loop entered");

    while state.run_state == RunState::Running {
        let now = shared.now();
        match select(&mut state, now) {
            Selection::Fire(entry, job) => {
                state.dispatch_seq += 1;
                let seq = state.dispatch_seq;
                state.in_flight = Some(InFlight { entry, seq });
                MutexGuard::unlocked(&mut state, || invoke(shared, entry, job));
                state.in_flight = None;
                shared.settled.notify_all();
            }
            Selection::WaitUntil(due) => {
                state.wake_target = Some(due);
                let timeout = due.saturating_duration_since(now);
                shared.wake.wait_for(&mut state, timeout);
                state.wake_target = None;
            }
            Selection::Idle => {
                shared.wake.wait(&mut state);
            }
        }
    }

    state.run_state = RunState::Stopped;
    state.dispatcher_thread = None;
    state.wake_target = None;
    shared.settled.notify_all();
    debug!("dispatcher loop exited");
}

/// Pick the earliest entry across both registries. Events win ties.
fn select(state: &mut State, now: Timestamp) -> Selection {
    let event = state.events.peek_earliest();
    let clock = state.clocks.peek_earliest();
    let (take_event, due) = match (event, clock) {
        (None, None) => return Selection::Idle,
        (Some(event), None) => (true, event.due),
        (None, Some(clock)) => (false, clock.due),
        (Some(event), Some(clock)) if event.due <= clock.due => (true, event.due),
        (Some(_), Some(clock)) => (false, clock.due),
    };

    if due > now {
        return Selection::WaitUntil(due);
    }
    let fired = if take_event {
        state
            .events
            .pop_due(now)
            .map(|(handle, entry)| Selection::Fire(EntryRef::Event(handle), entry.into_callback()))
    } else {
        state.clocks.pop_due(now).map(|(handle, callback)| {
            let job: Job = Box::new(move || callback());
            Selection::Fire(EntryRef::Clock(handle), job)
        })
    };
    fired.unwrap_or(Selection::WaitUntil(due))
}

fn invoke(shared: &Shared, entry: EntryRef, job: Job) {
    trace!(%entry, "dispatching");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.dispatcher.dispatch(job)));
    if let Err(payload) = outcome {
        error!(%entry, panic = %panic_message(payload.as_ref()), "callback panicked");
    }
}
