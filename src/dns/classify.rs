//! Address scope classification.
//!
//! Decides whether an IP returned by a resolver is routable on the public
//! network. Only global-unicast addresses count as usable.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use strum_macros::{Display, EnumIter};

/// Scope class of an IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum AddressScope {
    /// The unspecified address (`0.0.0.0`, `::`)
    AnyLocal,
    /// `127.0.0.0/8`, `::1`
    Loopback,
    /// `169.254.0.0/16`, `fe80::/10`
    LinkLocal,
    /// RFC 1918 ranges, `fec0::/10` and unique-local `fc00::/7`
    SiteLocal,
    /// `224.0.0.0/4`, `ff00::/8` (node, link, site, org and global scopes)
    Multicast,
    /// Everything else
    GlobalUnicast,
}

/// An IP address annotated with its scope class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    /// The resolved address
    pub ip: IpAddr,
    /// Its scope class
    pub scope: AddressScope,
}

impl ResolvedAddress {
    /// Classifies `ip` and wraps it.
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            scope: classify(ip),
        }
    }

    /// The loopback address handed out for `localhost`.
    pub fn loopback() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    /// Returns `true` if the address is routable on the public network.
    pub fn is_usable(&self) -> bool {
        self.scope == AddressScope::GlobalUnicast
    }
}

impl From<IpAddr> for ResolvedAddress {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip)
    }
}

/// Classifies an IP address by scope.
pub fn classify(ip: IpAddr) -> AddressScope {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => classify_v4(v4),
            None => classify_v6(v6),
        },
    }
}

fn classify_v4(ip: Ipv4Addr) -> AddressScope {
    if ip.is_unspecified() {
        AddressScope::AnyLocal
    } else if ip.is_loopback() {
        AddressScope::Loopback
    } else if ip.is_link_local() {
        AddressScope::LinkLocal
    } else if ip.is_private() {
        AddressScope::SiteLocal
    } else if ip.is_multicast() {
        AddressScope::Multicast
    } else {
        AddressScope::GlobalUnicast
    }
}

fn classify_v6(ip: Ipv6Addr) -> AddressScope {
    let s = ip.segments();
    if ip.is_unspecified() {
        AddressScope::AnyLocal
    } else if ip.is_loopback() {
        AddressScope::Loopback
    } else if ip.is_multicast() {
        AddressScope::Multicast
    } else if (s[0] & 0xffc0) == 0xfe80 {
        AddressScope::LinkLocal
    } else if (s[0] & 0xffc0) == 0xfec0 || (s[0] & 0xfe00) == 0xfc00 {
        AddressScope::SiteLocal
    } else {
        AddressScope::GlobalUnicast
    }
}
