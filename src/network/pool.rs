//! Worker Pool
//!
//! Fixed set of threads running connection handlers.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender, TrySendError};

use crate::error::{RegistryError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size thread pool fed by a crossbeam channel
///
/// ## Queue policy:
/// - `None`: unbounded queue, every accepted connection eventually runs
/// - `Some(n)`: at most `n` jobs wait for a worker, extra jobs are rejected
pub struct WorkerPool {
    /// Job queue (None once shut down)
    sender: Option<Sender<Job>>,

    /// Worker threads
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers sharing one queue
    pub fn new(size: usize, queue_capacity: Option<usize>) -> Result<Self> {
        if size == 0 {
            return Err(RegistryError::Config(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let (sender, receiver) = match queue_capacity {
            Some(capacity) => channel::bounded::<Job>(capacity),
            None => channel::unbounded::<Job>(),
        };

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("registry-worker-{}", index))
                .spawn(move || {
                    // Ends once the sender is dropped and the queue is drained
                    for job in receiver.iter() {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!("Connection handler panicked on worker {}", index);
                        }
                    }
                    tracing::trace!("Worker {} exiting", index);
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Queue a job without blocking the caller
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| RegistryError::Capacity("worker pool is shut down".to_string()))?;

        sender.try_send(Box::new(job)).map_err(|e| match e {
            TrySendError::Full(_) => {
                RegistryError::Capacity("connection queue is full".to_string())
            }
            TrySendError::Disconnected(_) => {
                RegistryError::Capacity("worker pool is shut down".to_string())
            }
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Jobs waiting for a free worker
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Stop taking jobs, let queued jobs finish, join the workers
    pub fn shutdown(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
