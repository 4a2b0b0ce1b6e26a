use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::models::task::Task;
use crate::worker::executor::run_task;

pub const DEFAULT_WORKERS: usize = 5;

/// Zero means "not configured" and falls back to [`DEFAULT_WORKERS`].
pub fn effective_workers(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => DEFAULT_WORKERS,
    }
}

/// A fixed set of worker threads fed through a zero-capacity queue, so
/// `submit` blocks until some worker is free to take the task.
pub struct WorkerPool {
    sender: Sender<Task>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts up to `size` workers. If the OS refuses a thread after at least
    /// one worker is running, the pool carries on with the ones it has.
    pub fn new(size: usize) -> io::Result<Self> {
        let size = effective_workers(Some(size));
        let (sender, receiver) = bounded(0);
        let mut workers = Vec::new();
        for id in 0..size {
            match spawn_worker_thread(id, receiver.clone()) {
                Ok(handle) => workers.push(handle),
                Err(e) if !workers.is_empty() => {
                    warn!(
                        "Could only start {} of {} workers: {}",
                        workers.len(),
                        size,
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        info!("Started worker pool with {} workers.", workers.len());
        Ok(WorkerPool { sender, workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn submit(&self, task: Task) {
        debug!("Submitting task '{}'.", task.name);
        if let Err(e) = self.sender.send(task) {
            error!("No worker left to take task '{}'.", e.into_inner().name);
        }
    }

    /// Closes the queue and waits for every in-flight task to finish.
    pub fn join(self) {
        drop(self.sender);
        for worker in self.workers {
            if worker.join().is_err() {
                error!("Worker thread panicked.");
            }
        }
    }
}

/// Runs all `tasks` and returns once every one has finished.
///
/// The pool never has more workers than tasks. Tasks that could not be
/// handed to a worker are dropped unrun, which closes their result senders.
pub fn run(tasks: Vec<Task>, size: usize) -> io::Result<()> {
    if tasks.is_empty() {
        return Ok(());
    }
    let pool = WorkerPool::new(effective_workers(Some(size)).min(tasks.len()))?;
    for task in tasks {
        pool.submit(task);
    }
    pool.join();
    Ok(())
}

fn spawn_worker_thread(id: usize, receiver: Receiver<Task>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("worker-{}", id))
        .spawn(move || {
            for task in receiver {
                debug!("Worker {} picked up '{}'.", id, task.name);
                run_task(&task);
            }
            debug!("Worker {} exiting.", id);
        })
}
