use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};
use tracing::{debug, error};
use super::queue::{ConnectionQueue, Dequeued};

type Handler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Fixed set of workers pulling connections off a shared queue.
pub struct ThreadPool<T: Send + 'static> {
    threads: Vec<Worker>,
    queue: Arc<ConnectionQueue<T>>,
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>
}

impl<T: Send + 'static> ThreadPool<T> {
    pub fn new<F>(num: usize, queue: Arc<ConnectionQueue<T>>, handler: F) -> io::Result<ThreadPool<T>>
        where F: Fn(T) + Send + Sync + 'static {
        if num == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "thread pool needs at least one worker"));
        }
        let handler: Handler<T> = Arc::new(handler);
        let mut threads = Vec::with_capacity(num);

        for id in 0..num {
            match Worker::new(id, queue.clone(), handler.clone()) {
                Ok(worker) => threads.push(worker),
                Err(e) => {
                    // Workers already running would otherwise block forever.
                    let partial = ThreadPool { threads, queue };
                    partial.shutdown();
                    return Err(e);
                }
            }
        }
        Ok(ThreadPool {
            threads,
            queue
        })
    }

    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Signals the queue and waits for every worker to drain it and exit.
    pub fn shutdown(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        self.queue.signal_shutdown();

        for worker in &mut self.threads {
            if let Some(handle) = worker.handle.take() {
                debug!("Shutting down worker {}", worker.id);
                if handle.join().is_err() {
                    error!("Worker {} exited abnormally", worker.id);
                }
            }
        }
    }
}

impl<T: Send + 'static> Drop for ThreadPool<T> {
    fn drop(&mut self) {
        self.join_all();
    }
}

impl Worker {
    fn new<T: Send + 'static>(id: usize, queue: Arc<ConnectionQueue<T>>, handler: Handler<T>) -> io::Result<Worker> {
        let handle = Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || {
                loop {
                    match queue.dequeue() {
                        Dequeued::Connection(connection) => {
                            // The connection is dropped (closed) while unwinding.
                            if catch_unwind(AssertUnwindSafe(|| handler(connection))).is_err() {
                                error!("Worker {} recovered from a panic while handling a connection", id);
                            }
                        },
                        Dequeued::ShutdownComplete => {
                            debug!("Terminating worker {}", id);
                            break
                        }
                    }
                }
            })?;
        Ok(Worker {
            id,
            handle: Some(handle)
        })
    }
}
