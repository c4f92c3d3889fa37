//! Configuration types and CLI options.
//!
//! `TransportConfig` carries the construction-time knobs of the transport.
//! `Config` is the command-line surface of the fetch binary and converts into
//! a `TransportConfig`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    CONNECT_TIMEOUT, DISK_CACHE_BYTES, DISK_CACHE_DIR_NAME, NO_STORE_HOSTS, POOL_IDLE_TIMEOUT,
    POOL_MAX_IDLE, PRIMARY_HOST, READ_TIMEOUT, USER_AGENT_PREFIX, VERSION_CODE, WRITE_TIMEOUT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Construction-time configuration of the transport.
///
/// Every field is read once by [`crate::TransportBuilder`]; nothing here can be
/// changed on a built transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Value stamped into the outbound `User-Agent` header
    pub user_agent: String,
    /// Host whose `Date` headers feed the server clock
    pub primary_host: String,
    /// Hosts whose responses are forced to `Cache-Control: no-store`
    pub no_store_hosts: Vec<String>,
    /// Inject artificial latency before every request (never in release builds)
    pub debug_delay: bool,
    /// Per-read bound; resets after every successful read, so slow but
    /// steady bodies are never cut off
    pub read_timeout: Duration,
    /// Write timeout, applied as `TCP_USER_TIMEOUT` where the platform has
    /// it (Linux, Android, Fuchsia)
    pub write_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Maximum idle connections per host
    pub pool_max_idle: usize,
    /// Idle connection keep-alive
    pub pool_idle_timeout: Duration,
    /// Retry a request once when its connection fails
    pub retry_on_connection_failure: bool,
    /// Byte budget of the disk response cache
    pub disk_cache_bytes: u64,
    /// Directory of the disk response cache; `None` disables it
    pub cache_dir: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("{USER_AGENT_PREFIX}{VERSION_CODE}"),
            primary_host: PRIMARY_HOST.to_string(),
            no_store_hosts: NO_STORE_HOSTS.iter().map(|h| h.to_string()).collect(),
            debug_delay: false,
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            pool_max_idle: POOL_MAX_IDLE,
            pool_idle_timeout: POOL_IDLE_TIMEOUT,
            retry_on_connection_failure: true,
            disk_cache_bytes: DISK_CACHE_BYTES,
            cache_dir: Some(std::env::temp_dir().join(DISK_CACHE_DIR_NAME)),
        }
    }
}

/// Command-line options of the fetch binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pr0gramm_transport",
    about = "Fetch URLs through the resilient transport and report what happened"
)]
pub struct Config {
    /// URLs to fetch
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Delay every request to surface races (debug builds only)
    #[arg(long)]
    pub debug_delay: bool,

    /// Do not start the local caching proxy
    #[arg(long)]
    pub no_proxy: bool,

    /// Fetch the URLs through the tiered image fetcher
    #[arg(long)]
    pub images: bool,

    /// Override the User-Agent identifier
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Directory of the disk response cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Do not cache responses on disk
    #[arg(long)]
    pub no_disk_cache: bool,

    /// Print the most recent log lines before exiting
    #[arg(long)]
    pub dump_log: bool,
}

impl From<&Config> for TransportConfig {
    fn from(config: &Config) -> Self {
        let mut transport = TransportConfig {
            debug_delay: config.debug_delay,
            ..Default::default()
        };
        if let Some(user_agent) = &config.user_agent {
            transport.user_agent = user_agent.clone();
        }
        if config.no_disk_cache {
            transport.cache_dir = None;
        } else if let Some(dir) = &config.cache_dir {
            transport.cache_dir = Some(dir.clone());
        }
        transport
    }
}
