//! An embedded worker owns a plain queue and runs nothing until somebody
//! drains it. Every blocking `wait()` in single-threaded code goes through
//! here.
//!
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::worker::{Work, Worker};
use crate::Error;

/// Queued work usually owns promises bound to this same worker, and those
/// promises own the worker. Work that will never be drained keeps the worker
/// alive through that cycle; call [`shutdown`](Self::shutdown) to let go of
/// it.
///
/// # Examples
///
/// ```
/// use promise_loop::{EmbeddedWorker, Worker, WorkerExt};
/// let worker = EmbeddedWorker::new();
/// let future = worker.submit(|| Ok::<_, ()>("a"));
/// assert!(worker.has_pending_work());
/// worker.run_until_idle().unwrap();
/// assert_eq!(future.result(), Some(Ok("a")));
/// ```
#[derive(Default)]
pub struct EmbeddedWorker {
    queue: Mutex<VecDeque<Work>>,
}

impl EmbeddedWorker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of work items waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Throw away every queued work item without running it, returning how
    /// many there were.
    ///
    /// Promises owned by the discarded work are dropped still pending. Work
    /// scheduled afterwards is queued as usual.
    pub fn shutdown(&self) -> usize {
        let discarded = std::mem::take(&mut *self.queue.lock());
        let count = discarded.len();
        // Dropping work can drop promises, which must not find the queue locked.
        drop(discarded);
        tracing::debug!(discarded = count, "embedded worker shut down");
        count
    }
}

impl std::fmt::Debug for EmbeddedWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedWorker")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Worker for EmbeddedWorker {
    fn schedule(&self, work: Work) {
        self.queue.lock().push_back(work);
    }

    fn run_until_idle(&self) -> Result<(), Error> {
        let mut ran = 0usize;
        // The lock is released before each item runs so work may schedule more.
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                Some(work) => {
                    work();
                    ran += 1;
                }
                None => break,
            }
        }
        tracing::trace!(ran, "embedded worker idle");
        Ok(())
    }

    fn has_pending_work(&self) -> bool {
        !self.queue.lock().is_empty()
    }
}
