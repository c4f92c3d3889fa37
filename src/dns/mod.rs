//! Hostname resolution.
//!
//! This module provides the two-tier resolver used by the configured client:
//! - Scope classification of resolved addresses (usable vs. local/private)
//! - The system and secondary (public DNS, A records) lookup tiers
//! - `FallbackResolver`, which combines them and plugs into reqwest
//!
//! Lookups block on real network I/O and run on the tokio runtime.

mod classify;
mod lookup;
mod resolver;

// Re-export public API
pub use classify::{classify, AddressScope, ResolvedAddress};
pub use lookup::{HostLookup, SecondaryLookup, SystemLookup};
pub use resolver::FallbackResolver;
