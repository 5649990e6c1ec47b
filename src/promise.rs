use std::sync::Arc;

use crate::future::{Future, Shared};
use crate::worker::SharedWorker;
use crate::Error;

/// The write side: the only handle allowed to deliver a result.
///
/// A promise completes exactly once. It is not `Clone`; put it in an `Arc`
/// when several contexts race to complete it, and exactly one of them wins.
///
/// # Examples
///
/// ```
/// use promise_loop::{EmbeddedWorker, Promise, SharedWorker};
/// let worker: SharedWorker = EmbeddedWorker::new();
/// let op = Promise::<String, String>::new(&worker);
/// let op_a = op.future();
/// op.succeed(String::from("🍓"));
/// assert_eq!(op_a.wait(), Ok("🍓".to_string()));
/// ```
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(worker: &SharedWorker) -> Self {
        Self {
            shared: Shared::pending(worker),
        }
    }

    /// A handle to the same result slot, as many times as asked.
    pub fn future(&self) -> Future<T, E> {
        Future {
            shared: self.shared.clone(),
        }
    }

    /// # Panics
    ///
    /// If the promise was already completed.
    pub fn succeed(&self, value: T) {
        self.complete(Ok(value))
    }

    /// # Panics
    ///
    /// If the promise was already completed.
    pub fn fail(&self, error: E) {
        self.complete(Err(error))
    }

    /// # Panics
    ///
    /// If the promise was already completed.
    pub fn complete(&self, result: Result<T, E>) {
        if let Err(err) = self.try_complete(result) {
            panic!("{err}");
        }
    }

    pub fn try_succeed(&self, value: T) -> Result<(), Error> {
        self.try_complete(Ok(value))
    }

    pub fn try_fail(&self, error: E) -> Result<(), Error> {
        self.try_complete(Err(error))
    }

    /// Complete the promise unless somebody else already did.
    pub fn try_complete(&self, result: Result<T, E>) -> Result<(), Error> {
        self.shared.complete(result)
    }
}

impl<T, E> std::fmt::Debug for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("complete", &!self.shared.is_pending())
            .finish()
    }
}

impl<T, E> Drop for Promise<T, E> {
    fn drop(&mut self) {
        // Observers attached to a dropped pending promise never run.
        if self.shared.is_pending() {
            tracing::debug!("promise dropped before it was completed");
        }
    }
}
