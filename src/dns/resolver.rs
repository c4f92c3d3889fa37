//! Two-tier hostname resolution with usability filtering.
//!
//! Implements `reqwest::dns::Resolve` so the configured client routes every
//! connection through it.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use super::classify::ResolvedAddress;
use super::lookup::HostLookup;
use crate::error_handling::DnsError;

/// Resolves through the system resolver and falls back to a secondary
/// resolver when the system answer contains no usable address.
///
/// Filtering is only a usability check: when at least one system address is
/// usable, the system answer is returned as-is, unusable entries included.
#[derive(Clone)]
pub struct FallbackResolver {
    system: Arc<dyn HostLookup>,
    secondary: Arc<dyn HostLookup>,
}

impl FallbackResolver {
    /// Creates a resolver from its two tiers.
    pub fn new(system: Arc<dyn HostLookup>, secondary: Arc<dyn HostLookup>) -> Self {
        Self { system, secondary }
    }

    /// Resolves `host` to the set of addresses a connection may use.
    ///
    /// # Errors
    ///
    /// Returns `DnsError::ResolutionFailed` when neither tier observed any
    /// address. Failures of either tier are logged and count as "no
    /// addresses"; they are never surfaced on their own.
    pub async fn resolve(&self, host: &str) -> Result<Vec<ResolvedAddress>, DnsError> {
        if host == "localhost" || host == "127.0.0.1" {
            return Ok(vec![ResolvedAddress::loopback()]);
        }

        let resolved: Vec<ResolvedAddress> = match self.system.lookup(host).await {
            Ok(ips) => ips.into_iter().map(ResolvedAddress::new).collect(),
            Err(e) => {
                debug!("System resolver failed for {host}: {e}");
                Vec::new()
            }
        };

        if resolved.iter().any(ResolvedAddress::is_usable) {
            debug!("System resolver for {host} returned {resolved:?}");
            return Ok(resolved);
        }

        let fallback = match self.secondary.lookup(host).await {
            Ok(ips) => ips,
            Err(DnsError::ResolverUnavailable(reason)) => {
                debug!("Secondary resolver unavailable for {host}: {reason}");
                Vec::new()
            }
            Err(e) => {
                warn!("Secondary resolver failed for {host}: {e}");
                Vec::new()
            }
        };

        if !fallback.is_empty() {
            info!("Fallback resolver for {host} returned {fallback:?}");
            return Ok(fallback.into_iter().map(ResolvedAddress::new).collect());
        }

        if resolved.is_empty() {
            return Err(DnsError::ResolutionFailed {
                host: host.to_string(),
            });
        }

        // nothing better available, hand back what the system told us
        Ok(resolved)
    }
}

impl std::fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackResolver").finish_non_exhaustive()
    }
}

impl Resolve for FallbackResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let addrs = FallbackResolver::resolve(&resolver, name.as_str())
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

            let addrs: Addrs = Box::new(
                addrs
                    .into_iter()
                    .map(|addr| SocketAddr::new(addr.ip, 0))
                    .collect::<Vec<_>>()
                    .into_iter(),
            );
            Ok(addrs)
        })
    }
}
