//! Shared utilities: time sources and telemetry setup.

/// Timestamps, clock kinds and time sources.
pub mod clock;
/// Tracing subscriber helpers.
pub mod telemetry;

pub use clock::*;
pub use telemetry::*;
