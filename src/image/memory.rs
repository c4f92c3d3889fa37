//! Byte-bounded in-memory thumbnail cache.

use bytes::Bytes;
use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::config::THUMBNAIL_CACHE_BYTES;

/// Immutable payload plus its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBytes {
    pub content_type: String,
    pub bytes: Bytes,
}

/// LRU cache keyed by the full URL string, weighed by payload size.
///
/// Safe to share between concurrent fetches; clones share storage.
#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Cache<String, CachedBytes>,
}

impl ThumbnailCache {
    /// Creates a cache with the default 1 MiB budget.
    pub fn new() -> Self {
        Self::with_budget(THUMBNAIL_CACHE_BYTES)
    }

    /// Creates a cache holding at most `budget` payload bytes.
    pub fn with_budget(budget: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(budget)
            .weigher(|_key: &String, value: &CachedBytes| -> u32 {
                u32::try_from(value.bytes.len()).unwrap_or(u32::MAX)
            })
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &str) -> Option<CachedBytes> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: &str, value: CachedBytes) {
        self.inner.insert(key.to_string(), value).await;
    }

    /// Total payload bytes currently held (after pending maintenance).
    pub async fn weighted_size(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.weighted_size()
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> CachedBytes {
        CachedBytes {
            content_type: "image/jpeg".to_string(),
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = ThumbnailCache::new();
        cache.insert("https://thumb.pr0gramm.com/a.jpg", payload(10)).await;

        let hit = cache.get("https://thumb.pr0gramm.com/a.jpg").await;
        assert_eq!(hit, Some(payload(10)));
        assert_eq!(cache.get("https://thumb.pr0gramm.com/b.jpg").await, None);
    }

    #[tokio::test]
    async fn test_budget_is_measured_in_bytes() {
        let cache = ThumbnailCache::with_budget(1000);
        for i in 0..10 {
            cache.insert(&format!("k{i}"), payload(400)).await;
        }

        // Ten entries of 400 bytes cannot fit into 1000 bytes.
        assert!(cache.weighted_size().await <= 1000);
    }
}
