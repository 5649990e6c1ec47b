//! The execution context every promise is bound to.
//!
//! A [`Worker`] only has to accept units of work and run them later, in
//! submission order. Workers that can also drain their queue synchronously
//! (see [`EmbeddedWorker`](crate::embedded::EmbeddedWorker)) make the blocking
//! [`Future::wait`](crate::Future::wait) available.
use std::sync::Arc;

use crate::{Error, Future, Promise};

/// A unit of work handed to a worker.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// How promises and futures hold on to their worker.
pub type SharedWorker = Arc<dyn Worker>;

pub trait Worker: Send + Sync + 'static {
    /// Enqueue `work` for later execution.
    ///
    /// Implementations must never run `work` on the calling stack: callbacks
    /// routinely complete other promises, and running them inline would nest
    /// one frame per link of a combinator chain.
    fn schedule(&self, work: Work);

    /// Run scheduled work, including work scheduled while draining, until
    /// nothing is left.
    fn run_until_idle(&self) -> Result<(), Error> {
        Err(Error::DrainUnsupported)
    }

    /// Whether scheduled work is still waiting to run.
    fn has_pending_work(&self) -> bool;
}

/// Factory helpers for anything that can be turned into a [`SharedWorker`].
///
/// # Examples
///
/// ```
/// use promise_loop::{EmbeddedWorker, WorkerExt};
/// let worker = EmbeddedWorker::new();
/// let promise = worker.new_promise::<String, String>();
/// promise.succeed("🍓".into());
/// assert_eq!(promise.future().wait(), Ok("🍓".to_string()));
/// ```
pub trait WorkerExt {
    fn shared(&self) -> SharedWorker;

    fn new_promise<T, E>(&self) -> Promise<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        Promise::new(&self.shared())
    }

    fn succeeded<T, E>(&self, value: T) -> Future<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        Future::succeeded(value, &self.shared())
    }

    fn failed<T, E>(&self, error: E) -> Future<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        Future::failed(error, &self.shared())
    }

    /// An already succeeded future carrying no value.
    fn done<E>(&self) -> Future<(), E>
    where
        E: Clone + Send + 'static,
    {
        self.succeeded(())
    }

    /// Run `f` on the worker and expose its outcome as a future.
    fn submit<T, E, F>(&self, f: F) -> Future<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let worker = self.shared();
        let promise = Promise::new(&worker);
        let future = promise.future();
        worker.schedule(Box::new(move || promise.complete(f())));
        future
    }
}

impl<W: Worker> WorkerExt for Arc<W> {
    fn shared(&self) -> SharedWorker {
        self.clone()
    }
}

impl WorkerExt for SharedWorker {
    fn shared(&self) -> SharedWorker {
        self.clone()
    }
}
