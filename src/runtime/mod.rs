//! Runtime adapters that implement `Dispatcher` on top of an async runtime.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_dispatcher;

#[cfg(feature = "tokio-runtime")]
pub use tokio_dispatcher::TokioDispatcher;
