//! Transport configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, pool sizing, hosts, cache budgets)
//! - `TransportConfig`, the construction-time knobs of the transport
//! - CLI option types for the fetch binary

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, TransportConfig};
