//! The two resolver tiers.
//!
//! `SystemLookup` asks the platform resolver; `SecondaryLookup` sends A-record
//! queries straight to a public DNS endpoint through `hickory-resolver`, whose
//! record cache avoids repeated wire lookups for the same hostname.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;

use crate::error_handling::DnsError;

/// One tier of hostname resolution.
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Resolves `host` to zero or more addresses.
    ///
    /// An unknown host is `Ok(vec![])`, not an error.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, DnsError>;
}

/// The platform resolver (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Default)]
pub struct SystemLookup;

#[async_trait]
impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let target = format!("{host}:0");
        let addrs = tokio::net::lookup_host(&target)
            .await
            .map_err(|e| DnsError::Lookup(format!("system lookup of '{host}' failed: {e}")))?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// A-record lookups against a fixed public DNS server.
#[derive(Clone)]
pub struct SecondaryLookup {
    resolver: Arc<TokioAsyncResolver>,
}

impl SecondaryLookup {
    /// Wraps a configured resolver (see [`crate::initialization::init_resolver`]).
    pub fn new(resolver: Arc<TokioAsyncResolver>) -> Self {
        Self { resolver }
    }
}

impl std::fmt::Debug for SecondaryLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryLookup").finish_non_exhaustive()
    }
}

#[async_trait]
impl HostLookup for SecondaryLookup {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        match self.resolver.ipv4_lookup(host).await {
            Ok(response) => Ok(response.iter().map(|a| IpAddr::V4(a.0)).collect()),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
                ResolveErrorKind::NoConnections
                | ResolveErrorKind::Message(_)
                | ResolveErrorKind::Msg(_) => Err(DnsError::ResolverUnavailable(e.to_string())),
                _ => Err(DnsError::Lookup(e.to_string())),
            },
        }
    }
}
