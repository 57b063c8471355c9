//! Fixed-size worker pool shared by every asynchronous stage.
//!
//! Threads pull boxed jobs from one channel. Each submission gets a
//! [`TaskHandle`] that can be polled or waited on. Panics inside a job are
//! caught and handed back through the handle instead of killing the thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::util::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Commands consumed by pool threads.
enum PoolCommand {
    Run(Job),
    Stop,
}

/// Pool of long-lived worker threads.
pub struct WorkerPool {
    tx: Sender<PoolCommand>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `min(requested, available_parallelism)` threads, at least one.
    pub fn new(requested: usize) -> Self {
        let hw = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let size = requested.min(hw).max(1);

        let (tx, rx) = channel::<PoolCommand>();
        let rx = Arc::new(Mutex::new(rx));
        let threads = (0..size)
            .map(|i| {
                let rx = Arc::clone(&rx);
                thread::Builder::new()
                    .name(format!("aobake-worker-{i}"))
                    .spawn(move || worker_loop(rx))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("failed to spawn pool thread: {e}");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(requested, threads = threads.len(), "worker pool started");
        Self { tx, threads }
    }

    /// Number of live threads.
    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Queue `f` and return a handle to its result.
    pub fn submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.try_submit(move || Ok(f()))
    }

    /// Queue a fallible `f`. An `Err` it returns comes back from
    /// [`TaskHandle::wait`] as is.
    pub fn try_submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (res_tx, res_rx) = channel();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f));
            flag.store(true, Ordering::Release);
            // Receiver gone means nobody is waiting
            let _ = res_tx.send(result);
        });

        if self.threads.is_empty() || self.tx.send(PoolCommand::Run(job)).is_err() {
            // Dropping the job drops res_tx, so wait() reports PoolClosed
            finished.store(true, Ordering::Release);
        }

        TaskHandle { rx: res_rx, finished }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Stops queue behind pending jobs, so queued work still runs
        for _ in 0..self.threads.len() {
            let _ = self.tx.send(PoolCommand::Stop);
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(rx: Arc<Mutex<Receiver<PoolCommand>>>) {
    loop {
        // Lock only for the receive, never while running a job
        let cmd = match rx.lock().recv() {
            Ok(cmd) => cmd,
            Err(_) => break,
        };
        match cmd {
            PoolCommand::Run(job) => job(),
            PoolCommand::Stop => break,
        }
    }
}

/// Completion signal for one submitted job.
pub struct TaskHandle<T> {
    rx: Receiver<thread::Result<Result<T>>>,
    finished: Arc<AtomicBool>,
}

impl<T> TaskHandle<T> {
    /// Non-blocking completion check.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Block until the job has run and return its value.
    ///
    /// A panic inside the job becomes [`Error::WorkerPanicked`].
    pub fn wait(self) -> Result<T> {
        match self.rx.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => Err(Error::from_panic(payload)),
            Err(_) => Err(Error::PoolClosed),
        }
    }
}
