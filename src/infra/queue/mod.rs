//! Due-time queue backends.

pub mod memory;

pub use memory::DueTimeQueue;
