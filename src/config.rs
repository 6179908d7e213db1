use std::path::PathBuf;
use clap::{App, Arg, ArgMatches};
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_ROOT: &str = "./www";
pub const DEFAULT_DOCUMENT: &str = "index.html";
pub const DEFAULT_READ_BUFFER: usize = 4096;

/// Everything the server needs to bind, resolve and serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Document root. Nothing outside of it is ever served.
    pub root: PathBuf,
    /// Fixed size of the worker pool.
    pub workers: usize,
    /// File served for an empty or `/` request path.
    pub default_document: String,
    /// Upper bound of the single read taken from each connection.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            root: PathBuf::from(DEFAULT_ROOT),
            workers: DEFAULT_WORKERS,
            default_document: DEFAULT_DOCUMENT.to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<ServerConfig, ConfigError> {
        let defaults = ServerConfig::default();

        let port = match matches.value_of("port") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value.to_string()))?,
            None => defaults.port,
        };

        let workers = match matches.value_of("workers") {
            Some(value) => match value.parse::<usize>() {
                Ok(count) if count > 0 => count,
                _ => return Err(ConfigError::InvalidWorkers(value.to_string())),
            },
            None => defaults.workers,
        };

        let read_buffer_size = match matches.value_of("read_buffer") {
            Some(value) => match value.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidReadBuffer(value.to_string())),
            },
            None => defaults.read_buffer_size,
        };

        Ok(ServerConfig {
            address: matches.value_of("address").map(str::to_string).unwrap_or(defaults.address),
            port,
            root: matches.value_of("root").map(PathBuf::from).unwrap_or(defaults.root),
            workers,
            default_document: matches
                .value_of("index")
                .map(str::to_string)
                .unwrap_or(defaults.default_document),
            read_buffer_size,
        })
    }
}

pub fn cli<'a, 'b>() -> App<'a, 'b> {
    App::new("pool-file-server")
        .version("1.0")
        .about("A static file server backed by a fixed thread pool")
        .arg(Arg::with_name("address")
            .short("a")
            .long("address")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .takes_value(true))
        .arg(Arg::with_name("port")
            .short("p")
            .long("port")
            .value_name("PORT_NUMBER")
            .default_value("8080")
            .takes_value(true))
        .arg(Arg::with_name("root")
            .short("r")
            .long("root")
            .value_name("ROOT_DIRECTORY")
            .default_value(DEFAULT_ROOT)
            .takes_value(true))
        .arg(Arg::with_name("workers")
            .short("w")
            .long("workers")
            .value_name("COUNT")
            .default_value("10")
            .takes_value(true))
        .arg(Arg::with_name("index")
            .long("index")
            .value_name("FILE_NAME")
            .default_value(DEFAULT_DOCUMENT)
            .takes_value(true))
        .arg(Arg::with_name("read_buffer")
            .long("read-buffer")
            .value_name("BYTES")
            .default_value("4096")
            .takes_value(true))
        .arg(Arg::with_name("verbose")
            .short("v")
            .long("verbose")
            .help("Log every request at debug level"))
}
