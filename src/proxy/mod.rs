//! Local caching proxy.
//!
//! This module provides:
//! - `ProxyService`, which rewrites URLs to go through a proxy
//! - `IdentityProxy`, the fallback when no listener could be started
//! - `HttpProxyService`, a loopback listener serving from the persistent cache
//! - `ProxyBootstrap`, the single-flight startup with bounded port retries

mod bootstrap;
mod service;

// Re-export public API
pub use bootstrap::{HttpProxyFactory, ProxyBootstrap, ProxyFactory, ProxyState};
pub use service::{HttpProxyService, IdentityProxy, ProxyService};
