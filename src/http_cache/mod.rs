//! Disk response cache.
//!
//! Successful `GET` responses carrying an explicit `max-age` are kept on
//! disk, within a fixed byte budget, and replayed until they expire.
//! Responses marked `no-store` or `no-cache` are never written.

mod control;
mod store;

// Re-export public API
pub use control::{storable_lifetime, CacheControl};
pub use store::{DiskCache, StoredResponse};
