//! Time representation and pluggable time sources.
//!
//! All due times handled by the scheduler are [`Timestamp`]s: absolute offsets
//! from the epoch of the clock that produced them. For the realtime clock the
//! epoch is the Unix epoch; for the monotonic clock it is an arbitrary,
//! process-wide instant fixed on first use.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// An absolute point in time, measured from the epoch of its clock.
///
/// Arithmetic saturates instead of panicking, so `Timestamp::MAX` can be used
/// as a "never" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The epoch itself.
    pub const ZERO: Self = Self(Duration::ZERO);
    /// The latest representable point in time.
    pub const MAX: Self = Self(Duration::MAX);

    /// Create a timestamp `offset` after the epoch.
    #[must_use]
    pub const fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Create a timestamp from whole seconds after the epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Create a timestamp from milliseconds after the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Convert a wall-clock time into a realtime-clock timestamp.
    ///
    /// Times before the Unix epoch clamp to [`Timestamp::ZERO`].
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        Self(time.duration_since(UNIX_EPOCH).unwrap_or_default())
    }

    /// Offset of this timestamp from the epoch.
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Add `by`, saturating at [`Timestamp::MAX`].
    #[must_use]
    pub const fn saturating_add(self, by: Duration) -> Self {
        Self(self.0.saturating_add(by))
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        self.saturating_add(rhs)
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        *self = self.saturating_add(rhs);
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.0.as_secs(), self.0.subsec_nanos())
    }
}

/// Which system clock a scheduler measures due times against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockType {
    /// Wall-clock time since the Unix epoch. Subject to system clock changes.
    #[default]
    Realtime,
    /// Steady time since a process-wide reference instant.
    Monotonic,
}

impl fmt::Display for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realtime => write!(f, "realtime"),
            Self::Monotonic => write!(f, "monotonic"),
        }
    }
}

/// Source of the current time for a scheduler.
pub trait TimeSource: Send + Sync + 'static {
    /// The current time.
    fn now(&self) -> Timestamp;
}

fn monotonic_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Time source reading one of the system clocks.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    clock_type: ClockType,
}

impl SystemTimeSource {
    /// Create a time source for the given clock.
    #[must_use]
    pub fn new(clock_type: ClockType) -> Self {
        if clock_type == ClockType::Monotonic {
            // Pin the epoch now so the first reading is not zero by accident.
            let _ = monotonic_epoch();
        }
        Self { clock_type }
    }

    /// The clock this source reads.
    #[must_use]
    pub const fn clock_type(&self) -> ClockType {
        self.clock_type
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new(ClockType::Realtime)
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        match self.clock_type {
            ClockType::Realtime => Timestamp::from_system_time(SystemTime::now()),
            ClockType::Monotonic => Timestamp(monotonic_epoch().elapsed()),
        }
    }
}

/// Time source that only moves when told to.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: Mutex<Timestamp>,
}

impl ManualTimeSource {
    /// Create a source frozen at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move time forward by `by` and return the new time.
    pub fn advance(&self, by: Duration) -> Timestamp {
        let mut now = self.now.lock();
        *now += by;
        *now
    }

    /// Jump to `time`. Moving backwards is allowed; the scheduler never fires
    /// an entry whose due time is after the reported time.
    pub fn set(&self, time: Timestamp) {
        *self.now.lock() = time;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
