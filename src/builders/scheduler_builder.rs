//! Builder to construct a `Scheduler` from configuration.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::dispatcher::{DirectDispatcher, Dispatcher};
use crate::core::error::{SchedulerError, SchedulerResult};
use crate::core::scheduler::Scheduler;
use crate::util::clock::{SystemTimeSource, TimeSource};

/// Assembles a [`Scheduler`] from a config plus optional dispatcher and time
/// source overrides.
///
/// ```rust
/// use prometheus_event_scheduler::builders::SchedulerBuilder;
/// use prometheus_event_scheduler::config::SchedulerConfig;
/// use prometheus_event_scheduler::util::ClockType;
///
/// let scheduler = SchedulerBuilder::new(
///     SchedulerConfig::new()
///         .with_clock_type(ClockType::Monotonic)
///         .with_max_events(1024),
/// )
/// .build()
/// .unwrap();
/// assert_eq!(scheduler.clock_type(), ClockType::Monotonic);
/// ```
#[derive(Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    time_source: Option<Arc<dyn TimeSource>>,
}

impl SchedulerBuilder {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            dispatcher: None,
            time_source: None,
        }
    }

    /// Invoke callbacks through `dispatcher` instead of directly.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: impl Dispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Read time from `time_source` instead of the configured system clock.
    #[must_use]
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Validate the configuration and create a stopped scheduler.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if the configuration fails validation.
    pub fn build(self) -> SchedulerResult<Scheduler> {
        self.config
            .validate()
            .map_err(SchedulerError::InvalidConfig)?;
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(DirectDispatcher));
        let time_source = self
            .time_source
            .unwrap_or_else(|| Arc::new(SystemTimeSource::new(self.config.clock_type)));
        Ok(Scheduler::from_parts(self.config, dispatcher, time_source))
    }
}
