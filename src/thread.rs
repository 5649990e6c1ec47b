//! A thread worker uses a multi-producer, single-consumer channel as its
//! backend. Any thread may schedule; one dedicated thread runs the work in the
//! order it was sent.
//!
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle, ThreadId},
};

use crate::worker::{Work, Worker};
use crate::Error;

/// Settings for the background thread of a [`ThreadWorker`].
#[derive(Debug, Clone)]
pub struct ThreadWorkerConfig {
    /// Name given to the OS thread.
    pub name: String,
    /// Stack size for the thread; the platform default when `None`.
    pub stack_size: Option<usize>,
}

impl Default for ThreadWorkerConfig {
    fn default() -> Self {
        Self {
            name: "promise-loop-worker".into(),
            stack_size: None,
        }
    }
}

/// Worker backed by one background thread.
///
/// It cannot drain synchronously, so [`Future::wait`](crate::Future::wait)
/// is off limits for its futures; `.await` them instead.
///
/// # Examples
///
/// ```
/// use promise_loop::{ThreadWorker, WorkerExt};
/// use futures::executor::block_on;
/// let worker = ThreadWorker::new().unwrap();
/// let future = worker.submit(|| Ok::<_, String>(21)).map(|v| v * 2);
/// assert_eq!(block_on(async { future.await }), Ok(42));
/// ```
#[derive(Debug)]
pub struct ThreadWorker {
    sender: Option<Sender<Work>>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    pending: Arc<AtomicUsize>,
    name: String,
}

impl ThreadWorker {
    pub fn new() -> Result<Arc<Self>, Error> {
        Self::with_config(ThreadWorkerConfig::default())
    }

    pub fn with_config(config: ThreadWorkerConfig) -> Result<Arc<Self>, Error> {
        let (tx, rx) = channel::<Work>();
        let pending = Arc::new(AtomicUsize::new(0));

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        let counter = pending.clone();
        let name = config.name.clone();
        let handle = builder
            .spawn(move || drain(rx, counter, name))
            .map_err(Error::Spawn)?;
        tracing::debug!(name = %config.name, "thread worker started");

        Ok(Arc::new(Self {
            sender: Some(tx),
            thread_id: handle.thread().id(),
            handle: Some(handle),
            pending,
            name: config.name,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn drain(receiver: Receiver<Work>, pending: Arc<AtomicUsize>, name: String) {
    // Ends once every sender is gone and the queue is empty.
    for work in receiver {
        if catch_unwind(AssertUnwindSafe(work)).is_err() {
            tracing::error!(name = %name, "work item panicked on thread worker");
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
    tracing::debug!(name = %name, "thread worker stopped");
}

impl Worker for ThreadWorker {
    fn schedule(&self, work: Work) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(work).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!(name = %self.name, "thread worker is gone, dropping work");
        }
    }

    fn has_pending_work(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}

impl Drop for ThreadWorker {
    /// Close the channel and let the thread finish what is queued.
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            // The last handle can be released by work running on the worker
            // thread itself; joining there would never return.
            if thread::current().id() == self.thread_id {
                return;
            }
            if handle.join().is_err() {
                tracing::error!(name = %self.name, "thread worker panicked");
            }
        }
    }
}
