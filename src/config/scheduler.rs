//! Scheduler and dispatcher-thread configuration structures.

use serde::{Deserialize, Serialize};

use crate::util::clock::ClockType;

/// Default name given to the dispatcher thread.
pub const DEFAULT_THREAD_NAME: &str = "event-scheduler";

/// Prefix of the environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "EVENT_SCHEDULER_";

/// Attributes of the dispatcher thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Thread name, visible in debuggers and log output.
    pub name: String,
    /// Stack size in bytes; `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl ThreadConfig {
    /// Set the thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Validate thread attributes.
    ///
    /// # Errors
    ///
    /// Describes the first invalid attribute.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("thread name must not be empty".into());
        }
        if self.name.contains('\0') {
            return Err("thread name must not contain NUL bytes".into());
        }
        if self.stack_size == Some(0) {
            return Err("stack_size must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Clock that due times are measured against.
    pub clock_type: ClockType,
    /// Maximum number of pending events; `None` is unbounded.
    pub max_events: Option<usize>,
    /// Maximum number of registered clocks; `None` is unbounded.
    pub max_clocks: Option<usize>,
    /// Dispatcher thread attributes used by `Scheduler::start`.
    pub thread: ThreadConfig,
}

impl SchedulerConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the clock type.
    #[must_use]
    pub fn with_clock_type(mut self, clock_type: ClockType) -> Self {
        self.clock_type = clock_type;
        self
    }

    /// Bound the number of pending events.
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = Some(max_events);
        self
    }

    /// Bound the number of registered clocks.
    #[must_use]
    pub fn with_max_clocks(mut self, max_clocks: usize) -> Self {
        self.max_clocks = Some(max_clocks);
        self
    }

    /// Set the dispatcher thread attributes.
    #[must_use]
    pub fn with_thread(mut self, thread: ThreadConfig) -> Self {
        self.thread = thread;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Describes the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_events == Some(0) {
            return Err("max_events must be greater than 0".into());
        }
        if self.max_clocks == Some(0) {
            return Err("max_clocks must be greater than 0".into());
        }
        self.thread
            .validate()
            .map_err(|e| format!("thread invalid: {e}"))
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns the parse error or the first invalid value.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `EVENT_SCHEDULER_*` environment variables,
    /// loading a `.env` file first if one is present.
    ///
    /// Recognised variables: `CLOCK_TYPE` (`realtime`/`monotonic`),
    /// `MAX_EVENTS`, `MAX_CLOCKS`, `THREAD_NAME` and `THREAD_STACK_SIZE`.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Describes a variable that cannot be parsed, or the first invalid
    /// value.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through
    /// `lookup` (called with the full, prefixed variable name).
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));
        let mut cfg = Self::default();

        if let Some(raw) = get("CLOCK_TYPE") {
            cfg.clock_type = match raw.trim().to_ascii_lowercase().as_str() {
                "realtime" => ClockType::Realtime,
                "monotonic" => ClockType::Monotonic,
                other => return Err(format!("unknown clock type `{other}`")),
            };
        }
        if let Some(raw) = get("MAX_EVENTS") {
            cfg.max_events = Some(parse_usize("MAX_EVENTS", &raw)?);
        }
        if let Some(raw) = get("MAX_CLOCKS") {
            cfg.max_clocks = Some(parse_usize("MAX_CLOCKS", &raw)?);
        }
        if let Some(name) = get("THREAD_NAME") {
            cfg.thread.name = name;
        }
        if let Some(raw) = get("THREAD_STACK_SIZE") {
            cfg.thread.stack_size = Some(parse_usize("THREAD_STACK_SIZE", &raw)?);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_usize(var: &str, raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{var}: {e}"))
}
