//! Combinators over a single future.
//!
//! Each one allocates a fresh promise on the input's worker and completes it
//! from an observer on the input, so every callback runs on that worker.
use crate::{Future, Promise};

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn derived<U, E2>(&self) -> (Promise<U, E2>, Future<U, E2>)
    where
        U: Clone + Send + 'static,
        E2: Clone + Send + 'static,
    {
        let promise = Promise::new(self.worker());
        let future = promise.future();
        (promise, future)
    }

    /// Transform a success; a failure passes through untouched and
    /// `transform` never runs.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_loop::{EmbeddedWorker, WorkerExt};
    /// let worker = EmbeddedWorker::new();
    /// let len = worker.succeeded::<_, ()>("four").map(|s| s.len());
    /// assert_eq!(len.wait(), Ok(4));
    /// ```
    pub fn map<U, F>(&self, transform: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |result| promise.complete(result.map(transform)));
        future
    }

    /// Like [`map`](Self::map), for transforms that can fail themselves.
    pub fn try_map<U, F>(&self, transform: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |result| promise.complete(result.and_then(transform)));
        future
    }

    /// Continue with the future `continuation` builds from a success, and
    /// forward whatever it settles with. A failure short-circuits.
    pub fn flat_map<U, F>(&self, continuation: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U, E> + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |result| match result {
            Ok(value) => continuation(value).when_complete(move |next| promise.complete(next)),
            Err(error) => promise.fail(error),
        });
        future
    }

    /// Transform a failure; a success passes through.
    pub fn map_err<E2, F>(&self, transform: F) -> Future<T, E2>
    where
        E2: Clone + Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |result| promise.complete(result.map_err(transform)));
        future
    }

    /// Recover from a failure with a value.
    pub fn catch_map<F>(&self, recover: F) -> Future<T, E>
    where
        F: FnOnce(E) -> T + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |result| match result {
            Ok(value) => promise.succeed(value),
            Err(error) => promise.succeed(recover(error)),
        });
        future
    }

    /// Recover from a failure with another future.
    pub fn catch_flat_map<F>(&self, recover: F) -> Future<T, E>
    where
        F: FnOnce(E) -> Future<T, E> + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |result| match result {
            Ok(value) => promise.succeed(value),
            Err(error) => recover(error).when_complete(move |next| promise.complete(next)),
        });
        future
    }

    /// Succeed with `value` once this future succeeds.
    pub fn transform<U>(&self, value: U) -> Future<U, E>
    where
        U: Clone + Send + 'static,
    {
        self.map(move |_| value)
    }

    /// Succeed with `value` once this future settles, however it settles.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_loop::{EmbeddedWorker, WorkerExt};
    /// let worker = EmbeddedWorker::new();
    /// let failed = worker.failed::<&str, _>("b".to_string());
    /// assert_eq!(failed.transform_always(1).wait(), Ok(1));
    /// ```
    pub fn transform_always<U>(&self, value: U) -> Future<U, E>
    where
        U: Clone + Send + 'static,
    {
        let (promise, future) = self.derived();
        self.when_complete(move |_| promise.succeed(value));
        future
    }

    /// Run `callback` once this future settles; returns `self` for chaining.
    pub fn always<F>(&self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.when_complete(move |_| callback());
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::{EmbeddedWorker, Worker, WorkerExt};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn map_runs_the_transform_once() {
        let worker = EmbeddedWorker::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let mapped = worker.submit(|| Ok::<_, String>(2)).map(move |v| {
            c.fetch_add(1, Ordering::SeqCst);
            v * 10
        });
        assert_eq!(mapped.wait(), Ok(20));
        assert_eq!(mapped.wait(), Ok(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn map_skips_the_transform_on_failure() {
        let worker = EmbeddedWorker::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let mapped = worker.failed::<i32, _>("nope".to_string()).map(move |v| {
            c.fetch_add(1, Ordering::SeqCst);
            v
        });
        assert_eq!(mapped.wait(), Err("nope".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn try_map_can_fail() {
        let worker = EmbeddedWorker::new();
        let parsed = worker
            .succeeded::<_, String>("x1")
            .try_map(|s| s.parse::<i32>().map_err(|e| e.to_string()));
        assert!(parsed.wait().is_err());
    }

    #[test]
    fn flat_map_forwards_the_inner_result() {
        let worker = EmbeddedWorker::new();
        let w = worker.clone();
        let ok = worker
            .succeeded::<_, String>(3)
            .flat_map(move |v| w.submit(move || Ok(v + 1)));
        assert_eq!(ok.wait(), Ok(4));

        let w = worker.clone();
        let inner_failed = worker
            .succeeded::<i32, String>(3)
            .flat_map(move |_| w.failed::<i32, _>("inner".into()));
        assert_eq!(inner_failed.wait(), Err("inner".to_string()));
    }

    #[test]
    fn flat_map_short_circuits_on_failure() {
        let worker = EmbeddedWorker::new();
        let called = Arc::new(AtomicUsize::new(0));
        let (c, w) = (called.clone(), worker.clone());
        let chained = worker.failed::<i32, _>("outer".to_string()).flat_map(move |v| {
            c.fetch_add(1, Ordering::SeqCst);
            w.succeeded(v)
        });
        assert_eq!(chained.wait(), Err("outer".to_string()));
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn recovering_from_failure() {
        let worker = EmbeddedWorker::new();
        let failed = worker.failed::<usize, String>("oops".into());
        assert_eq!(failed.catch_map(|e| e.len()).wait(), Ok(4));
        let w = worker.clone();
        assert_eq!(
            failed.catch_flat_map(move |_| w.succeeded(9)).wait(),
            Ok(9)
        );
        assert_eq!(
            failed.map_err(|e| e.to_uppercase()).wait(),
            Err("OOPS".to_string())
        );
        let ok = worker.succeeded::<usize, String>(1);
        assert_eq!(ok.catch_map(|_| 0).wait(), Ok(1));
    }

    #[test]
    fn transform_discards_the_value_but_keeps_failures() {
        let worker = EmbeddedWorker::new();
        let ok = worker.succeeded::<_, String>(1).transform("a");
        assert_eq!(ok.wait(), Ok("a"));
        let err = worker.failed::<i32, String>("e".into()).transform("a");
        assert_eq!(err.wait(), Err("e".to_string()));
    }

    #[test]
    fn always_runs_on_both_outcomes() {
        let worker = EmbeddedWorker::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());
        let ok = worker
            .succeeded::<_, String>(1)
            .always(move || a.lock().push("ok"));
        let err = worker
            .failed::<i32, String>("e".into())
            .always(move || b.lock().push("err"));
        assert_eq!(ok.wait(), Ok(1));
        assert_eq!(err.wait(), Err("e".to_string()));
        worker.run_until_idle().unwrap();
        assert_eq!(*log.lock(), vec!["ok", "err"]);
    }
}
