use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Hand-off point between the dispatcher and the worker pool.
///
/// Entries come out in the order they went in. Once shutdown is signalled the
/// queue refuses new entries, but workers keep receiving whatever was already
/// queued; `Dequeued::ShutdownComplete` is only returned once it is empty.
pub struct ConnectionQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

struct QueueState<T> {
    pending: VecDeque<T>,
    shutdown: bool,
    waiting: usize,
}

pub enum Dequeued<T> {
    Connection(T),
    ShutdownComplete,
}

/// Returned by `enqueue` after shutdown; the caller gets its connection back
/// and is responsible for closing it.
pub struct QueueClosed<T>(pub T);

impl<T> ConnectionQueue<T> {
    pub fn new() -> ConnectionQueue<T> {
        ConnectionQueue {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                shutdown: false,
                waiting: 0,
            }),
            available: Condvar::new(),
        }
    }

    pub fn enqueue(&self, connection: T) -> Result<(), QueueClosed<T>> {
        {
            let mut state = self.lock();
            if state.shutdown {
                return Err(QueueClosed(connection));
            }
            state.pending.push_back(connection);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a connection is available or the queue is shut down and empty.
    pub fn dequeue(&self) -> Dequeued<T> {
        let mut state = self.lock();
        loop {
            if let Some(connection) = state.pending.pop_front() {
                return Dequeued::Connection(connection);
            }
            if state.shutdown {
                return Dequeued::ShutdownComplete;
            }
            state.waiting += 1;
            state = self.available.wait(state).unwrap_or_else(PoisonError::into_inner);
            state.waiting -= 1;
        }
    }

    pub fn signal_shutdown(&self) {
        self.lock().shutdown = true;
        self.available.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Number of workers currently blocked in `dequeue`.
    pub fn waiting(&self) -> usize {
        self.lock().waiting
    }

    // Nothing panics while holding the lock, so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ConnectionQueue<T> {
    fn default() -> ConnectionQueue<T> {
        ConnectionQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionQueue, Dequeued, QueueClosed};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn take(queue: &ConnectionQueue<u32>) -> Option<u32> {
        match queue.dequeue() {
            Dequeued::Connection(c) => Some(c),
            Dequeued::ShutdownComplete => None,
        }
    }

    #[test]
    fn dequeues_in_fifo_order() {
        let queue = ConnectionQueue::new();
        for i in 0..5 {
            assert!(queue.enqueue(i).is_ok());
        }

        assert_eq!(5, queue.len());
        let drained: Vec<u32> = (0..5).filter_map(|_| take(&queue)).collect();
        assert_eq!(vec![0, 1, 2, 3, 4], drained);
        assert!(queue.is_empty());
    }

    #[test]
    fn enqueue_after_shutdown_hands_the_connection_back() {
        let queue = ConnectionQueue::new();
        assert!(!queue.is_shutdown());
        queue.signal_shutdown();
        assert!(queue.is_shutdown());

        match queue.enqueue(7) {
            Err(QueueClosed(returned)) => assert_eq!(7, returned),
            Ok(()) => panic!("queue accepted a connection after shutdown"),
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn shutdown_drains_queued_connections_first() {
        let queue = ConnectionQueue::new();
        for i in 0..3 {
            assert!(queue.enqueue(i).is_ok());
        }
        queue.signal_shutdown();

        assert_eq!(Some(0), take(&queue));
        assert_eq!(Some(1), take(&queue));
        assert_eq!(Some(2), take(&queue));
        assert_eq!(None, take(&queue));
        assert_eq!(None, take(&queue));
    }

    #[test]
    fn shutdown_wakes_every_waiting_worker() {
        let queue = Arc::new(ConnectionQueue::<u32>::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let q = queue.clone();
                thread::spawn(move || take(&q))
            })
            .collect();

        while queue.waiting() < 4 {
            thread::sleep(Duration::from_millis(5));
        }
        queue.signal_shutdown();

        for handle in handles {
            assert_eq!(None, handle.join().unwrap());
        }
        assert_eq!(0, queue.waiting());
    }

    #[test]
    fn enqueue_wakes_a_blocked_worker() {
        let queue = Arc::new(ConnectionQueue::<u32>::new());
        let q = queue.clone();
        let handle = thread::spawn(move || take(&q));

        while queue.waiting() < 1 {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(queue.enqueue(42).is_ok());

        assert_eq!(Some(42), handle.join().unwrap());
    }
}
