//! `.await` support.
//!
//! Awaiting a [`Future`] attaches one observer on first poll. The observer
//! parks the result here and wakes whichever task polled last.
use std::sync::Arc;
use std::{
    future::IntoFuture,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use parking_lot::Mutex;

use crate::Future;

/// What `.await` on a [`Future`] actually polls.
///
/// # Examples
///
/// ```
/// use promise_loop::{ThreadWorker, WorkerExt};
/// use futures::executor::block_on;
/// use std::thread;
/// let worker = ThreadWorker::new().unwrap();
/// let op = worker.new_promise::<String, ()>();
/// let op_a = op.future();
/// let task1 = thread::spawn(move || block_on(async {
///     assert_eq!(op_a.await, Ok("🍓".to_string()));
/// }));
/// op.succeed(String::from("🍓"));
/// task1.join().expect("The task1 thread has panicked");
/// ```
pub struct Waiter<T, E> {
    future: Future<T, E>,
    inner: Option<Arc<Mutex<Inner<T, E>>>>,
}

struct Inner<T, E> {
    value: Option<Result<T, E>>,
    waker: Option<Waker>,
}

impl<T, E> std::future::Future for Waiter<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = match &this.inner {
            Some(inner) => inner.clone(),
            None => {
                let inner = Arc::new(Mutex::new(Inner {
                    value: None,
                    waker: None,
                }));
                let slot = inner.clone();
                this.future.when_complete(move |result| {
                    let mut slot = slot.lock();
                    slot.value = Some(result);
                    if let Some(waker) = slot.waker.take() {
                        waker.wake()
                    }
                });
                this.inner = Some(inner.clone());
                inner
            }
        };
        let mut inner = inner.lock();
        match inner.value.take() {
            Some(value) => Poll::Ready(value),
            None => {
                inner.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T, E> IntoFuture for Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = Waiter<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Waiter {
            future: self,
            inner: None,
        }
    }
}
