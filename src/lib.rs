//! Worker-driven promises and futures.
//!
//! A [`Promise`] is written exactly once; any number of [`Future`] handles read
//! it. Observers and combinators never run on the stack that registered them or
//! completed the promise; they are handed to the promise's [`Worker`], which
//! runs them in order. That keeps long combinator chains and large joins at a
//! constant stack depth.
//!
//! ```
//! use promise_loop::{map2, EmbeddedWorker, Flatten, WorkerExt};
//!
//! let worker = EmbeddedWorker::new();
//! let a = worker.submit(|| Ok::<_, String>("a"));
//! let b = worker.submit(|| Ok::<_, String>("b"));
//! assert_eq!(map2(&a, &b, |a, b| format!("{a}{b}")).wait(), Ok("ab".to_string()));
//!
//! let all = vec![a, b].flatten(&worker);
//! assert_eq!(all.wait(), Ok(vec!["a", "b"]));
//! ```
use thiserror::Error;

mod combinators;
pub mod embedded;
pub mod future;
pub mod join;
pub mod promise;
pub mod thread;
pub mod waiter;
pub mod worker;

pub use embedded::EmbeddedWorker;
pub use future::Future;
pub use join::{
    flat_map2, flat_map3, flat_map4, flat_map5, join_all, map2, map3, map4, map5, sequence,
    Flatten,
};
pub use promise::Promise;
pub use thread::{ThreadWorker, ThreadWorkerConfig};
pub use waiter::Waiter;
pub use worker::{SharedWorker, Work, Worker, WorkerExt};

/// Misuse of the primitives. Failures of the work itself travel in the
/// caller's own error type and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("promise already completed")]
    AlreadyCompleted,
    #[error("worker cannot drain its work synchronously")]
    DrainUnsupported,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
