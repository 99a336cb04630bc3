//! Infrastructure adapters for the time-ordered storage behind the registries.

pub mod queue;
pub use queue::DueTimeQueue;
