//! DNS resolver initialization.
//!
//! This module builds the secondary resolver queried when the system resolver
//! yields no usable address.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::config::{DNS_CACHE_SIZE, DNS_TIMEOUT_SECS, SECONDARY_DNS_SERVER};

/// Initializes the secondary DNS resolver.
///
/// Creates a resolver that talks to [`SECONDARY_DNS_SERVER`] only (no system
/// configuration, no search domains) with:
/// - A short query timeout so a dead network fails fast
/// - A record cache of [`DNS_CACHE_SIZE`] entries, so repeated lookups of the
///   same hostname within the record TTL never touch the wire
///
/// # Returns
///
/// A configured `TokioAsyncResolver` wrapped in `Arc` for sharing across tasks.
pub fn init_resolver() -> Arc<TokioAsyncResolver> {
    let name_servers = NameServerConfigGroup::from_ips_clear(
        &[SECONDARY_DNS_SERVER.ip()],
        SECONDARY_DNS_SERVER.port(),
        true,
    );
    let config = ResolverConfig::from_parts(None, vec![], name_servers);

    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
    opts.attempts = 2;
    opts.ndots = 0;
    opts.cache_size = DNS_CACHE_SIZE;

    Arc::new(TokioAsyncResolver::tokio(config, opts))
}
