//! Bounded worker pool with a join barrier.
//!
//! A fixed number of named worker threads pull boxed tasks from a shared
//! queue. Batch operations submit one task per input item and block on
//! [`Pool::join`] until every task has completed. Tasks are plain closures;
//! the pool never inspects results. Callers that need output send it back
//! over their own channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads.
pub struct Pool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Spawn a pool with the given concurrency bound (minimum 1).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..threads)
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("shard-worker-{}", i))
                    .spawn(move || Self::worker_loop(receiver))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    fn worker_loop(receiver: Arc<Mutex<Receiver<Task>>>) {
        loop {
            // Hold the queue lock only while dequeuing, never while running.
            let task = { receiver.lock().unwrap().recv() };
            match task {
                Ok(task) => task(),
                Err(_) => break,
            }
        }
    }

    /// Submit a task for execution.
    pub fn add<F: FnOnce() + Send + 'static>(&self, task: F) {
        if let Some(sender) = &self.sender {
            // Send only fails when every worker has exited, which cannot
            // happen before join() drops the sender.
            let _ = sender.send(Box::new(task));
        }
    }

    /// Block until every submitted task has completed.
    pub fn join(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
