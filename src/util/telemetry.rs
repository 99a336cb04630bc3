//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_DIRECTIVE: &str = "prometheus_event_scheduler=info";

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
///
/// `RUST_LOG` takes precedence; otherwise [`DEFAULT_LOG_DIRECTIVE`] applies.
/// Returns `true` if this call installed the subscriber.
pub fn init_tracing() -> bool {
    init_tracing_with_default(DEFAULT_LOG_DIRECTIVE)
}

/// Same as [`init_tracing`], with a caller-chosen fallback filter directive.
pub fn init_tracing_with_default(directive: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
