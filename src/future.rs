//! The read side of a promise.
//!
//! A [`Future`] is a cheap, clonable handle to a result slot. Observers may be
//! attached before or after the slot is filled; either way each observer is
//! called exactly once, on the bound worker, never on the registering stack.
use std::cell::{Cell, RefCell};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::worker::SharedWorker;
use crate::Error;

pub(crate) type Observer<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

pub(crate) enum Slot<T, E> {
    Pending(Vec<Observer<T, E>>),
    Complete(Result<T, E>),
}

pub(crate) struct Shared<T, E> {
    slot: Mutex<Slot<T, E>>,
    worker: SharedWorker,
    release: fn(Vec<Observer<T, E>>),
}

thread_local! {
    static DEFERRED: RefCell<Vec<Box<dyn Send>>> = const { RefCell::new(Vec::new()) };
    static RELEASING: Cell<bool> = const { Cell::new(false) };
}

/// Drop observers left on a pending slot without recursing.
///
/// An observer owns the promise of the next link, whose slot owns the next
/// observer, and so on. Dropping that chain naively costs one frame per link;
/// instead the outermost release on a thread drains a queue that nested
/// releases only push to.
fn release_observers<T, E>(observers: Vec<Observer<T, E>>)
where
    T: 'static,
    E: 'static,
{
    let garbage: Box<dyn Send> = Box::new(observers);
    let nested = match RELEASING.try_with(|releasing| releasing.replace(true)) {
        Ok(nested) => nested,
        // Thread-local storage is gone during thread teardown; drop in place.
        Err(_) => return,
    };
    if nested {
        if let Err(err) = DEFERRED.try_with(|queue| queue.borrow_mut().push(garbage)) {
            tracing::trace!(%err, "deferred drop queue unavailable");
        }
        return;
    }

    drop(garbage);
    while let Some(next) = DEFERRED.with(|queue| queue.borrow_mut().pop()) {
        drop(next);
    }
    RELEASING.with(|releasing| releasing.set(false));
}

impl<T, E> Drop for Shared<T, E> {
    fn drop(&mut self) {
        if let Slot::Pending(observers) = self.slot.get_mut() {
            if !observers.is_empty() {
                (self.release)(std::mem::take(observers));
            }
        }
    }
}

impl<T, E> Shared<T, E> {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Pending(_))
    }
}

impl<T, E> Shared<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn pending(worker: &SharedWorker) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot::Pending(Vec::new())),
            worker: worker.clone(),
            release: release_observers::<T, E>,
        })
    }

    fn complete_with(result: Result<T, E>, worker: &SharedWorker) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot::Complete(result)),
            worker: worker.clone(),
            release: release_observers::<T, E>,
        })
    }

    /// The single `Pending -> Complete` transition.
    ///
    /// Each observer becomes its own work item, handed to the worker inside
    /// the same critical section, so a concurrent [`observe`](Self::observe)
    /// queues behind them and a panicking observer cannot take its siblings
    /// down with it.
    pub(crate) fn complete(&self, result: Result<T, E>) -> Result<(), Error> {
        let mut slot = self.slot.lock();
        let observers = match &mut *slot {
            Slot::Complete(_) => return Err(Error::AlreadyCompleted),
            Slot::Pending(observers) => std::mem::take(observers),
        };
        *slot = Slot::Complete(result.clone());
        if !observers.is_empty() {
            tracing::trace!(observers = observers.len(), "scheduling observers");
            for observer in observers {
                let result = result.clone();
                self.worker.schedule(Box::new(move || observer(result)));
            }
        }
        Ok(())
    }

    pub(crate) fn observe(&self, observer: Observer<T, E>) {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Pending(observers) => observers.push(observer),
            Slot::Complete(result) => {
                let result = result.clone();
                self.worker.schedule(Box::new(move || observer(result)));
            }
        }
    }

    pub(crate) fn peek(&self) -> Option<Result<T, E>> {
        match &*self.slot.lock() {
            Slot::Pending(_) => None,
            Slot::Complete(result) => Some(result.clone()),
        }
    }

    pub(crate) fn worker(&self) -> &SharedWorker {
        &self.worker
    }
}

/// Shared handle to the eventual result of a [`Promise`](crate::Promise).
pub struct Future<T, E> {
    pub(crate) shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A future that is already successful, without going through a promise.
    pub fn succeeded(value: T, worker: &SharedWorker) -> Self {
        Self {
            shared: Shared::complete_with(Ok(value), worker),
        }
    }

    /// A future that has already failed with `error`.
    pub fn failed(error: E, worker: &SharedWorker) -> Self {
        Self {
            shared: Shared::complete_with(Err(error), worker),
        }
    }

    /// The worker observers of this future run on.
    pub fn worker(&self) -> &SharedWorker {
        self.shared.worker()
    }

    pub fn is_complete(&self) -> bool {
        !self.shared.is_pending()
    }

    /// The stored result, if there is one yet. Never blocks or drains.
    pub fn result(&self) -> Option<Result<T, E>> {
        self.shared.peek()
    }

    /// Call `callback` with the result once it is known.
    pub fn when_complete<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        self.shared.observe(Box::new(callback));
    }

    /// Register a success/failure pair; exactly one of them runs, once.
    pub fn add_observer<S, F>(&self, on_success: S, on_failure: F)
    where
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        self.when_complete(move |result| match result {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        });
    }

    pub fn when_success<S>(&self, on_success: S)
    where
        S: FnOnce(T) + Send + 'static,
    {
        self.when_complete(move |result| {
            if let Ok(value) = result {
                on_success(value)
            }
        });
    }

    pub fn when_failure<F>(&self, on_failure: F)
    where
        F: FnOnce(E) + Send + 'static,
    {
        self.when_complete(move |result| {
            if let Err(error) = result {
                on_failure(error)
            }
        });
    }

    /// Block the calling context until the result is known.
    ///
    /// This drives the bound worker with
    /// [`run_until_idle`](crate::Worker::run_until_idle), so it only works for
    /// workers that can drain synchronously, and must not be called from
    /// inside an observer.
    ///
    /// # Panics
    ///
    /// If the worker cannot drain, or if it goes idle while the result is
    /// still pending (nothing on this context could ever complete it).
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_loop::{EmbeddedWorker, WorkerExt};
    /// let worker = EmbeddedWorker::new();
    /// let future = worker.failed::<i32, _>("💥".to_string());
    /// assert_eq!(future.wait(), Err("💥".to_string()));
    /// ```
    pub fn wait(&self) -> Result<T, E> {
        loop {
            if let Some(result) = self.shared.peek() {
                return result;
            }
            if let Err(err) = self.shared.worker().run_until_idle() {
                panic!("cannot wait on this future: {err}");
            }
            if let Some(result) = self.shared.peek() {
                return result;
            }
            if !self.shared.worker().has_pending_work() {
                panic!("future is still pending after its worker went idle");
            }
        }
    }
}
