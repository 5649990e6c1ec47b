//! Combinators over several futures.
//!
//! On failure every combinator here reports the error of the lowest-positioned
//! failed input, so the outcome never depends on the order in which inputs
//! happen to settle. [`and`](Future::and) and the variadic maps wait for all
//! of their inputs; [`join_all`] fails as soon as that lowest failure is known,
//! i.e. once every input before it has settled.
//!
//! Aggregation is counter based: each input gets one observer that fills a
//! pre-sized slot and decrements a counter, and the observer that settles the
//! outcome completes the output. No observer ever waits on another, so the
//! stack stays flat however many inputs there are.
use std::sync::Arc;

use parking_lot::Mutex;

use crate::worker::{SharedWorker, WorkerExt};
use crate::{Future, Promise};

struct Pair<T, U, E> {
    left: Option<Result<T, E>>,
    right: Option<Result<U, E>>,
    promise: Option<Promise<(T, U), E>>,
}

impl<T, U, E> Pair<T, U, E>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn settle(state: &Mutex<Self>, fill: impl FnOnce(&mut Self)) {
        let finished = {
            let mut pair = state.lock();
            fill(&mut *pair);
            if pair.left.is_some() && pair.right.is_some() {
                match (pair.promise.take(), pair.left.take(), pair.right.take()) {
                    (Some(promise), Some(left), Some(right)) => Some((promise, left, right)),
                    _ => None,
                }
            } else {
                None
            }
        };
        if let Some((promise, left, right)) = finished {
            promise.complete(match (left, right) {
                (Ok(left), Ok(right)) => Ok((left, right)),
                (Err(error), _) | (_, Err(error)) => Err(error),
            });
        }
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Pair this future with `other`. Settles once both have; if both fail,
    /// this future's error wins.
    pub fn and<U>(&self, other: &Future<U, E>) -> Future<(T, U), E>
    where
        U: Clone + Send + 'static,
    {
        let promise = Promise::new(self.worker());
        let future = promise.future();
        let state = Arc::new(Mutex::new(Pair {
            left: None,
            right: None,
            promise: Some(promise),
        }));

        let left = state.clone();
        self.when_complete(move |result| Pair::settle(&left, |pair| pair.left = Some(result)));
        other.when_complete(move |result| Pair::settle(&state, |pair| pair.right = Some(result)));
        future
    }
}

macro_rules! variadic_map {
    ($map:ident, $flat_map:ident; $head:ident: $H:ident, $($name:ident: $T:ident),+ => $pat:pat) => {
        /// Combine the values of every input, in argument order, once all
        /// have succeeded.
        pub fn $map<$H, $($T,)+ R, E, F>(
            $head: &Future<$H, E>,
            $($name: &Future<$T, E>,)+
            combine: F,
        ) -> Future<R, E>
        where
            $H: Clone + Send + 'static,
            $($T: Clone + Send + 'static,)+
            R: Clone + Send + 'static,
            E: Clone + Send + 'static,
            F: FnOnce($H, $($T),+) -> R + Send + 'static,
        {
            $head$(.and($name))+.map(move |$pat| combine($head, $($name),+))
        }

        /// Like the plain variadic map, for combiners that return a future.
        pub fn $flat_map<$H, $($T,)+ R, E, F>(
            $head: &Future<$H, E>,
            $($name: &Future<$T, E>,)+
            combine: F,
        ) -> Future<R, E>
        where
            $H: Clone + Send + 'static,
            $($T: Clone + Send + 'static,)+
            R: Clone + Send + 'static,
            E: Clone + Send + 'static,
            F: FnOnce($H, $($T),+) -> Future<R, E> + Send + 'static,
        {
            $head$(.and($name))+.flat_map(move |$pat| combine($head, $($name),+))
        }
    };
}

variadic_map!(map2, flat_map2; a: T1, b: T2 => (a, b));
variadic_map!(map3, flat_map3; a: T1, b: T2, c: T3 => ((a, b), c));
variadic_map!(map4, flat_map4; a: T1, b: T2, c: T3, d: T4 => (((a, b), c), d));
variadic_map!(map5, flat_map5; a: T1, b: T2, c: T3, d: T4, e: T5 => ((((a, b), c), d), e));

struct Gather<T, E> {
    values: Vec<Option<T>>,
    settled: Vec<bool>,
    /// Length of the run of settled inputs starting at index 0.
    prefix: usize,
    failure: Option<(usize, E)>,
    remaining: usize,
    promise: Option<Promise<Vec<T>, E>>,
}

impl<T, E> Gather<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn new(inputs: usize, promise: Promise<Vec<T>, E>) -> Self {
        Self {
            values: (0..inputs).map(|_| None).collect(),
            settled: vec![false; inputs],
            prefix: 0,
            failure: None,
            remaining: inputs,
            promise: Some(promise),
        }
    }

    fn settle(state: &Mutex<Self>, index: usize, result: Result<T, E>) {
        let finished = {
            let mut gather = state.lock();
            if gather.promise.is_none() {
                return;
            }
            match result {
                Ok(value) => gather.values[index] = Some(value),
                Err(error) => {
                    if gather.failure.as_ref().map_or(true, |(first, _)| index < *first) {
                        gather.failure = Some((index, error));
                    }
                }
            }
            gather.settled[index] = true;
            gather.remaining -= 1;
            while gather.prefix < gather.settled.len() && gather.settled[gather.prefix] {
                gather.prefix += 1;
            }

            // Nothing before the failed input is still open, so no lower
            // failure can turn up any more.
            let decided = match &gather.failure {
                Some((first, _)) => *first < gather.prefix,
                None => gather.remaining == 0,
            };
            if decided {
                let values = std::mem::take(&mut gather.values);
                let failure = gather.failure.take();
                gather.promise.take().map(|p| (p, values, failure))
            } else {
                None
            }
        };
        if let Some((promise, values, failure)) = finished {
            match failure {
                Some((index, error)) => {
                    tracing::trace!(index, "join failed");
                    promise.fail(error)
                }
                None => promise.succeed(values.into_iter().flatten().collect()),
            }
        }
    }
}

/// Collect the values of `futures`, in order, into one future on `worker`.
///
/// Succeeds once every input has; otherwise fails with the error of the
/// lowest-indexed failed input, as soon as every input before it has settled.
/// Inputs after it are not waited for. No inputs means an immediate empty
/// success.
///
/// # Examples
///
/// ```
/// use promise_loop::{join_all, EmbeddedWorker, WorkerExt};
/// let worker = EmbeddedWorker::new();
/// let a = worker.new_promise::<&str, String>();
/// let b = worker.new_promise::<&str, String>();
/// let flat = join_all([a.future(), b.future()], &worker);
/// b.succeed("b");
/// a.succeed("a");
/// assert_eq!(flat.wait(), Ok(vec!["a", "b"]));
/// ```
pub fn join_all<T, E, I, W>(futures: I, worker: &W) -> Future<Vec<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    I: IntoIterator<Item = Future<T, E>>,
    W: WorkerExt + ?Sized,
{
    let worker = worker.shared();
    let futures: Vec<_> = futures.into_iter().collect();
    if futures.is_empty() {
        return Future::succeeded(Vec::new(), &worker);
    }
    tracing::trace!(inputs = futures.len(), "joining futures");

    let promise = Promise::new(&worker);
    let future = promise.future();
    let state = Arc::new(Mutex::new(Gather::new(futures.len(), promise)));
    for (index, input) in futures.iter().enumerate() {
        let state = state.clone();
        input.when_complete(move |result| Gather::settle(&state, index, result));
    }
    future
}

/// `flatten` for an ordered collection of futures.
pub trait Flatten<T, E> {
    fn flatten<W>(self, worker: &W) -> Future<Vec<T>, E>
    where
        W: WorkerExt + ?Sized;
}

impl<T, E> Flatten<T, E> for Vec<Future<T, E>>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn flatten<W>(self, worker: &W) -> Future<Vec<T>, E>
    where
        W: WorkerExt + ?Sized,
    {
        join_all(self, worker)
    }
}

struct Sequence<T, E, F> {
    thunks: std::vec::IntoIter<F>,
    values: Vec<T>,
    promise: Promise<Vec<T>, E>,
}

impl<T, E, F> Sequence<T, E, F>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    F: FnOnce() -> Future<T, E> + Send + 'static,
{
    fn step(mut self) {
        match self.thunks.next() {
            None => {
                let values = std::mem::take(&mut self.values);
                self.promise.succeed(values);
            }
            Some(thunk) => thunk().when_complete(move |result| match result {
                Ok(value) => {
                    self.values.push(value);
                    self.step();
                }
                Err(error) => self.promise.fail(error),
            }),
        }
    }
}

/// Create and await futures one at a time, in order.
///
/// Each thunk runs only after the previous future succeeded; the first
/// failure stops the sequence and becomes the result.
pub fn sequence<T, E, F, W>(worker: &W, thunks: Vec<F>) -> Future<Vec<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    F: FnOnce() -> Future<T, E> + Send + 'static,
    W: WorkerExt + ?Sized,
{
    let worker: SharedWorker = worker.shared();
    let promise = Promise::new(&worker);
    let future = promise.future();
    let run = Sequence {
        values: Vec::with_capacity(thunks.len()),
        thunks: thunks.into_iter(),
        promise,
    };
    worker.schedule(Box::new(move || run.step()));
    future
}
