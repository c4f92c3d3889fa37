//! Configuration constants.
//!
//! This module defines the fixed knobs of the transport layer: timeouts,
//! connection pool sizing, cache budgets, and the hosts that get special
//! treatment in the interceptor pipeline and the image fetcher.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

// Transport timeouts
/// Read timeout applied to every request
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound on unacknowledged sent data (`TCP_USER_TIMEOUT`)
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
/// TCP connect timeout applied to every request
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// Connection pool
/// Maximum idle connections kept per host
pub const POOL_MAX_IDLE: usize = 8;
/// How long an idle pooled connection is kept alive
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry attempts after a connection failure (on top of the initial attempt)
pub const CONNECT_RETRY_ATTEMPTS: usize = 1;
/// Delay before retrying a request whose connection failed
pub const CONNECT_RETRY_DELAY_MS: u64 = 100;

// Disk response cache
/// Size budget of the disk response cache (64MB)
pub const DISK_CACHE_BYTES: u64 = 64 * 1024 * 1024;
/// Directory name of the default disk cache, under the system temp dir
pub const DISK_CACHE_DIR_NAME: &str = "pr0gramm_transport-http";
/// File extension of stored responses
pub const DISK_CACHE_ENTRY_EXT: &str = "entry";

// Hosts
/// Host whose responses drive server clock synchronization
pub const PRIMARY_HOST: &str = "pr0gramm.com";
/// Hosts whose responses must never be stored by the shared HTTP cache
pub const NO_STORE_HOSTS: &[&str] = &["vid.pr0gramm.com", "img.pr0gramm.com", "full.pr0gramm.com"];

/// Prefix of the versioned User-Agent identifier
pub const USER_AGENT_PREFIX: &str = "pr0gramm-app/v";
/// Version code stamped into the User-Agent
pub const VERSION_CODE: &str = env!("CARGO_PKG_VERSION");

// Debug delay (non-production builds only)
/// Artificial latency for requests to the primary host
pub const DEBUG_DELAY_PRIMARY: Duration = Duration::from_millis(750);
/// Artificial latency for every other request
pub const DEBUG_DELAY_OTHER: Duration = Duration::from_millis(500);

// DNS
/// Public DNS endpoint queried when the system resolver yields nothing usable
pub const SECONDARY_DNS_SERVER: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53);
/// DNS query timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 3;
/// Entries kept in the secondary resolver's record cache
pub const DNS_CACHE_SIZE: usize = 256;

// Local proxy
/// Maximum number of ports tried before proxying is disabled
pub const PROXY_MAX_ATTEMPTS: usize = 10;
/// Lower bound (inclusive) of randomly chosen proxy ports
pub const PROXY_PORT_MIN: u16 = 20_000;
/// Upper bound (exclusive) of randomly chosen proxy ports
pub const PROXY_PORT_MAX: u16 = 60_000;

// Image fetching
/// Host serving thumbnails
pub const THUMBNAIL_HOST: &str = "thumb.pr0gramm.com";
/// Path marker of thumbnails served from other hosts
pub const THUMBNAIL_PATH_MARKER: &str = "/thumb.jpg";
/// Total byte budget of the in-memory thumbnail cache (1MB)
pub const THUMBNAIL_CACHE_BYTES: u64 = 1024 * 1024;
/// Thumbnails at or above this size are never copied into memory (20KB)
pub const THUMBNAIL_BACKFILL_LIMIT: usize = 20 * 1024;
/// Content type assumed for cached thumbnails without one
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

// Logging
/// Number of records kept by the in-memory log ring buffer
pub const LOG_BUFFER_CAPACITY: usize = 4096;
