use std::net::{IpAddr, TcpListener};
use std::thread::{Builder, JoinHandle};
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod server;

pub use config::ServerConfig;
pub use error::{ConfigError, ServerError};
pub use server::Shutdown;
use server::Dispatcher;
use server::file_system::FileSystemAdapter;

pub struct ServerHandle {
    pub ip: String,
    pub port: u16,
    shutdown: Shutdown,
    handle: JoinHandle<()>
}

impl ServerHandle {
    /// A handle that stops the server from any thread.
    pub fn stopper(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Stops accepting, lets the workers drain queued connections and waits
    /// for them to exit.
    pub fn shutdown(self) {
        self.shutdown.request();
        self.wait();
    }

    /// Blocks until the dispatcher has stopped.
    pub fn wait(self) {
        if self.handle.join().is_err() {
            error!("Dispatcher thread panicked");
        }
    }
}

pub fn start_server(config: ServerConfig) -> Result<ServerHandle, ServerError> {
    if config.workers == 0 {
        return Err(ConfigError::InvalidWorkers(config.workers.to_string()).into());
    }
    if config.read_buffer_size == 0 {
        return Err(ConfigError::InvalidReadBuffer(config.read_buffer_size.to_string()).into());
    }
    let root_path = config.root.as_path();
    if !root_path.exists() {
        return Err(ServerError::RootNotFound(root_path.to_path_buf()));
    }
    if !root_path.is_dir() {
        return Err(ServerError::RootNotDirectory(root_path.to_path_buf()));
    }

    let address = config.bind_address();
    info!("binding to:{}", address);
    let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind { address, source })?;
    let local_addr = listener.local_addr()?;
    let ip = match local_addr.ip() {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6.to_string()
    };

    let adapter = FileSystemAdapter::new(root_path)?;
    info!("root={}->{}", root_path.display(), adapter.root().display());

    let dispatcher = Dispatcher::new(listener, &config, adapter).map_err(|source| ServerError::Spawn {
        name: "worker".to_string(),
        source
    })?;
    let shutdown = Shutdown::new(local_addr);
    let stopper = shutdown.clone();
    let handle = Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || dispatcher.run(stopper))
        .map_err(|source| ServerError::Spawn { name: "dispatcher".to_string(), source })?;

    Ok(ServerHandle { ip, port: local_addr.port(), shutdown, handle })
}
