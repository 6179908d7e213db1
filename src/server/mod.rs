use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};
use crate::config::ServerConfig;
use self::content_manager::ContentManager;
use self::handlers::handle_client;
use self::pool::ThreadPool;
use self::queue::{ConnectionQueue, QueueClosed};

/// Stop request shared between the dispatcher and whoever wants it to stop.
#[derive(Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    wake_addr: SocketAddr
}

impl Shutdown {
    pub fn new(listen_addr: SocketAddr) -> Shutdown {
        let ip = match listen_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip
        };
        Shutdown {
            requested: Arc::new(AtomicBool::new(false)),
            wake_addr: SocketAddr::new(ip, listen_addr.port())
        }
    }

    /// Sets the flag, then connects to the listener so a blocked `accept` returns
    /// and sees it.
    pub fn request(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, Duration::from_secs(1)) {
            debug!("Wake-up connection to {} failed:{}", self.wake_addr, e);
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Owns the listener and the worker pool fed from it.
pub struct Dispatcher {
    listener: TcpListener,
    queue: Arc<ConnectionQueue<TcpStream>>,
    pool: ThreadPool<TcpStream>
}

impl Dispatcher {
    pub fn new<M>(listener: TcpListener, config: &ServerConfig, manager: M) -> io::Result<Dispatcher>
        where M: ContentManager + Send + Sync + 'static {
        let queue = Arc::new(ConnectionQueue::new());
        let manager = Arc::new(manager);
        let default_document = config.default_document.clone();
        let read_limit = config.read_buffer_size;

        let pool = ThreadPool::new(config.workers, queue.clone(), move |stream: TcpStream| {
            let peer = stream.peer_addr().map(|addr| addr.to_string()).unwrap_or_else(|_| "unknown".to_string());
            let _span = info_span!("connection", %peer).entered();
            handle_client(stream, manager.as_ref(), &default_document, read_limit);
        })?;

        Ok(Dispatcher { listener, queue, pool })
    }

    /// Accepts until `shutdown` is requested, then drains the pool and closes
    /// the listener.
    pub fn run(self, shutdown: Shutdown) {
        let Dispatcher { listener, queue, pool } = self;
        info!("Dispatching to {} workers", pool.size());

        accept_connections(listener.incoming(), &queue, &shutdown);

        info!("Stopping; draining {} queued connections", queue.len());
        pool.shutdown();
        drop(listener);
        info!("All workers stopped");
    }
}

/// Feeds accepted connections into `queue` until `shutdown` is requested or
/// `incoming` runs out. Accept errors are logged and skipped.
fn accept_connections<S, I>(incoming: I, queue: &ConnectionQueue<S>, shutdown: &Shutdown)
    where I: IntoIterator<Item = io::Result<S>> {
    for stream_ref in incoming {
        if shutdown.is_requested() {
            // Either the wake-up connection or a client that arrived too late.
            drop(stream_ref);
            break;
        }
        match stream_ref {
            Ok(stream) => {
                if let Err(QueueClosed(rejected)) = queue.enqueue(stream) {
                    warn!("Queue closed; dropping connection");
                    drop(rejected);
                } else {
                    debug!("Client queued ({} pending)", queue.len());
                }
            },
            Err(e) => warn!("Error with stream:{}", e)
        }
    }
}

pub mod content_manager;
pub mod file_system;
pub mod handlers;
pub mod http;
pub mod pool;
pub mod queue;
pub mod response;

#[cfg(test)]
mod tests {
    use super::{accept_connections, Shutdown};
    use super::queue::{ConnectionQueue, Dequeued};
    use std::io;
    use std::net::TcpListener;

    fn stop_handle() -> (TcpListener, Shutdown) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let shutdown = Shutdown::new(listener.local_addr().unwrap());
        (listener, shutdown)
    }

    fn accept_error() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionAborted, "client gave up")
    }

    fn drain(queue: &ConnectionQueue<u32>) -> Vec<u32> {
        queue.signal_shutdown();
        let mut seen = Vec::new();
        while let Dequeued::Connection(c) = queue.dequeue() {
            seen.push(c);
        }
        seen
    }

    #[test]
    fn accept_errors_are_skipped() {
        let (_listener, shutdown) = stop_handle();
        let queue = ConnectionQueue::new();

        accept_connections(vec![Err(accept_error()), Ok(7), Err(accept_error()), Ok(8)], &queue, &shutdown);

        assert!(!shutdown.is_requested());
        assert_eq!(vec![7, 8], drain(&queue));
    }

    #[test]
    fn accept_error_after_stop_ends_the_loop() {
        let (_listener, shutdown) = stop_handle();
        let queue = ConnectionQueue::new();
        let stopper = shutdown.clone();

        let incoming = (0..3).map(|i| match i {
            0 => Ok(1),
            1 => {
                stopper.request();
                Err(accept_error())
            },
            _ => Ok(2)
        });
        accept_connections(incoming, &queue, &shutdown);

        assert_eq!(vec![1], drain(&queue));
    }

    #[test]
    fn connection_accepted_after_stop_is_not_queued() {
        let (_listener, shutdown) = stop_handle();
        let queue = ConnectionQueue::new();
        shutdown.request();

        accept_connections(vec![Ok(3)], &queue, &shutdown);

        assert!(queue.is_empty());
    }

    #[test]
    fn closed_queue_rejects_without_stopping_the_loop() {
        let (_listener, shutdown) = stop_handle();
        let queue = ConnectionQueue::<u32>::new();
        queue.signal_shutdown();

        accept_connections(vec![Ok(4), Ok(5)], &queue, &shutdown);

        assert!(queue.is_empty());
        assert!(queue.is_shutdown());
    }

    #[test]
    fn request_is_idempotent() {
        let (_listener, shutdown) = stop_handle();

        shutdown.request();
        shutdown.request();
        assert!(shutdown.clone().is_requested());
    }
}
