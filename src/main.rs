use std::process;
use pool_file_server::{config, start_server, ServerConfig, Shutdown};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = config::cli().get_matches();

    let filter = if matches.is_present("verbose") {
        "pool_file_server=debug"
    } else {
        "pool_file_server=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match ServerConfig::from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    // Must happen before any thread is spawned so every thread inherits the mask.
    let signals = signals::block();

    match start_server(config.clone()) {
        Ok(handle) => {
            info!("HTTP server (thread-pool) on {}:{} with {} workers", handle.ip, handle.port, config.workers);
            signals::stop_on_signal(signals, handle.stopper());
            handle.wait();
            info!("Server stopped");
        },
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

#[cfg(unix)]
mod signals {
    use std::mem;
    use std::ptr;
    use std::thread::Builder;
    use tracing::{info, warn};
    use super::Shutdown;

    pub type SignalSet = libc::sigset_t;

    /// Blocks SIGINT and SIGTERM on the calling thread so a dedicated thread
    /// can receive them with `sigwait`. `None` leaves the default actions in place.
    pub fn block() -> Option<SignalSet> {
        let mut set: libc::sigset_t = unsafe { mem::zeroed() };
        let rc = unsafe {
            if libc::sigemptyset(&mut set) != 0
                || libc::sigaddset(&mut set, libc::SIGINT) != 0
                || libc::sigaddset(&mut set, libc::SIGTERM) != 0 {
                -1
            } else {
                libc::pthread_sigmask(libc::SIG_BLOCK, &set, ptr::null_mut())
            }
        };
        if rc != 0 {
            warn!("Could not block SIGINT/SIGTERM ({}); signals will stop the process without draining", rc);
            return None;
        }
        Some(set)
    }

    pub fn stop_on_signal(set: Option<SignalSet>, shutdown: Shutdown) {
        let set = match set {
            Some(set) => set,
            None => return
        };
        let spawned = Builder::new().name("signals".to_string()).spawn(move || {
            let mut signal: libc::c_int = 0;
            let rc = unsafe { libc::sigwait(&set, &mut signal) };
            if rc == 0 {
                info!("Received signal {}; shutting down", signal);
            } else {
                warn!("sigwait failed ({}); shutting down", rc);
            }
            shutdown.request();
        });
        if let Err(e) = spawned {
            warn!("Could not start signal thread:{}", e);
        }
    }
}


#[cfg(not(unix))]
mod signals {
    use super::Shutdown;

    pub type SignalSet = ();

    pub fn block() -> Option<SignalSet> {
        None
    }

    pub fn stop_on_signal(_set: Option<SignalSet>, _shutdown: Shutdown) {}
}
