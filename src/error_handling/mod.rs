//! Error handling for the transport layer.
//!
//! Errors are split by concern:
//! - **Initialization**: logger, TLS and HTTP client setup
//! - **DNS**: resolution failures of the two-tier resolver
//! - **Cache**: failures of the persistent cache and the disk response cache
//! - **Transport**: what callers of the configured client observe

mod types;

// Re-export public API
pub use types::{CacheError, DnsError, InitializationError, TransportError};
