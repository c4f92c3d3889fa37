//! Transport initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger (env_logger plus the ring buffer of recent records)
//! - Crypto provider and TLS client configuration
//! - Secondary DNS resolver
//! - `TransportBuilder`, which assembles the configured client
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;
mod resolver;
mod tls;

use rustls::crypto::{ring::default_provider, CryptoProvider};

// Re-export public API
pub use client::TransportBuilder;
pub use logger::init_logger_with;
pub use resolver::init_resolver;
pub use tls::{cipher_suites, init_tls_config};

/// Initializes the crypto provider for TLS operations.
///
/// Installs ring as the process-wide `rustls` provider for connections not
/// built from [`init_tls_config`]. Call before any other TLS setup.
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}
