//! Manually advanced time for driving a scheduler in tests.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::core::scheduler::{Scheduler, Shared};
use crate::util::clock::{ManualTimeSource, TimeSource, Timestamp};

/// Offset between the scheduler's real time and the initial test time.
pub const TEST_TIME_OFFSET: Duration = Duration::from_secs(1000);

/// Replaces a scheduler's clock with one that only moves on
/// [`advance_time`](Self::advance_time).
///
/// Time starts [`TEST_TIME_OFFSET`] ahead of the scheduler's current time, so
/// anything already scheduled against the real clock is overdue. Dropping the
/// `TestTimeSource` leaves the scheduler frozen at the last test time.
///
/// ```rust
/// use prometheus_event_scheduler::{Scheduler, TestTimeSource};
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new();
/// let time = TestTimeSource::attach(&scheduler);
/// let due = time.now() + Duration::from_secs(5);
/// scheduler.schedule_event(due, || {}).unwrap();
/// time.advance_time(Duration::from_secs(5));
/// assert_eq!(scheduler.now(), due);
/// ```
#[derive(Debug)]
pub struct TestTimeSource {
    source: Arc<ManualTimeSource>,
    shared: Weak<Shared>,
}

impl TestTimeSource {
    /// Install a test clock in `scheduler`.
    #[must_use]
    pub fn attach(scheduler: &Scheduler) -> Self {
        let start = scheduler.now() + TEST_TIME_OFFSET;
        let source = Arc::new(ManualTimeSource::new(start));
        scheduler.shared.set_time_source(source.clone());
        scheduler.shared.wake_dispatcher();
        debug!(%start, "test time source attached");
        Self {
            source,
            shared: Arc::downgrade(&scheduler.shared),
        }
    }

    /// Current test time.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.source.now()
    }

    /// Move test time forward by `by` and let the dispatcher fire whatever
    /// became due. Returns the new time.
    pub fn advance_time(&self, by: Duration) -> Timestamp {
        let now = self.source.advance(by);
        if let Some(shared) = self.shared.upgrade() {
            shared.wake_dispatcher();
        }
        now
    }
}
