//! Dispatcher strategy through which every callback is invoked.

/// A unit of work handed to a [`Dispatcher`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Strategy for running callbacks selected by the dispatcher thread.
///
/// The scheduler decides *which* callback runs next and in what order; the
/// dispatcher decides *where* it runs. `dispatch` is called on the
/// scheduler's dispatcher thread, and the scheduler treats the entry as in
/// flight until `dispatch` returns. A dispatcher that hands the job to another
/// thread therefore shortens the window that `wait`-ing cancellations cover to
/// the hand-off itself.
///
/// Any `Fn(Job)` closure is a dispatcher, which makes it easy to record
/// dispatch order in tests.
///
/// # Example
///
/// ```rust
/// use prometheus_event_scheduler::core::{Dispatcher, Job};
///
/// struct Inline;
///
/// impl Dispatcher for Inline {
///     fn dispatch(&self, job: Job) {
///         job();
///     }
/// }
/// ```
pub trait Dispatcher: Send + Sync + 'static {
    /// Run (or arrange to run) `job`.
    fn dispatch(&self, job: Job);
}

impl<F> Dispatcher for F
where
    F: Fn(Job) + Send + Sync + 'static,
{
    fn dispatch(&self, job: Job) {
        self(job);
    }
}

/// Default dispatcher: runs the job on the dispatcher thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDispatcher;

impl Dispatcher for DirectDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Render a caught panic payload for logging.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
