//! Image fetching.
//!
//! Thumbnails are served from a byte-bounded in-memory LRU cache, filled
//! from the downloader for small payloads. Full images are delegated to the
//! persistent content-addressed cache, whose entries are scoped handles.

mod cache;
mod fetcher;
mod memory;

// Re-export public API
pub use cache::{CacheEntry, PassthroughCache, PersistentCache};
pub use fetcher::{is_thumbnail, Downloader, ImageResponse, ImageSource, TieredImageFetcher};
pub use memory::{CachedBytes, ThumbnailCache};
