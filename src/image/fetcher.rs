//! Tiered image fetching: memory, then network or persistent cache.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, trace};
use reqwest::StatusCode;
use url::Url;

use super::cache::PersistentCache;
use super::memory::{CachedBytes, ThumbnailCache};
use crate::config::{
    THUMBNAIL_BACKFILL_LIMIT, THUMBNAIL_CONTENT_TYPE, THUMBNAIL_HOST, THUMBNAIL_PATH_MARKER,
};
use crate::error_handling::TransportError;

/// Which tier produced an [`ImageResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Memory,
    Network,
    Cache,
}

/// A fully buffered image response.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub source: ImageSource,
}

/// Loads image bytes from the network (or whatever HTTP cache sits in front
/// of it).
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<ImageResponse, TransportError>;
}

/// Returns `true` for URLs served from the memory tier.
pub fn is_thumbnail(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host.contains(THUMBNAIL_HOST))
        || url.path().contains(THUMBNAIL_PATH_MARKER)
}

/// Image fetch policy keyed on URL shape.
///
/// Thumbnails go through a byte-bounded memory cache backed by the
/// downloader; small payloads are copied into memory on the way out. Every
/// other image is served by the persistent cache.
#[derive(Clone)]
pub struct TieredImageFetcher {
    memory: ThumbnailCache,
    downloader: Arc<dyn Downloader>,
    cache: Arc<dyn PersistentCache>,
}

impl TieredImageFetcher {
    pub fn new(downloader: Arc<dyn Downloader>, cache: Arc<dyn PersistentCache>) -> Self {
        Self::with_memory(ThumbnailCache::new(), downloader, cache)
    }

    pub fn with_memory(
        memory: ThumbnailCache,
        downloader: Arc<dyn Downloader>,
        cache: Arc<dyn PersistentCache>,
    ) -> Self {
        Self {
            memory,
            downloader,
            cache,
        }
    }

    pub fn memory(&self) -> &ThumbnailCache {
        &self.memory
    }

    /// Fetches `url` from the cheapest tier that has it.
    ///
    /// # Errors
    ///
    /// Returns the downloader's error for thumbnails and the persistent
    /// cache's error for full images. A failed backfill never fails the
    /// fetch.
    pub async fn fetch(&self, url: &Url) -> Result<ImageResponse, TransportError> {
        if !is_thumbnail(url) {
            let entry = self.cache.get(url).await?;
            return Ok(entry.to_response());
        }

        if let Some(cached) = self.memory.get(url.as_str()).await {
            trace!("Memory cache hit for {url}");
            return Ok(ImageResponse {
                status: StatusCode::OK,
                content_type: Some(cached.content_type),
                body: cached.bytes,
                source: ImageSource::Memory,
            });
        }

        let response = self.downloader.load(url).await?;
        if (1..THUMBNAIL_BACKFILL_LIMIT).contains(&response.body.len()) {
            debug!(
                "Caching {} bytes for {url} in memory",
                response.body.len()
            );
            let content_type = response
                .content_type
                .clone()
                .unwrap_or_else(|| THUMBNAIL_CONTENT_TYPE.to_string());
            self.memory
                .insert(
                    url.as_str(),
                    CachedBytes {
                        content_type,
                        bytes: response.body.clone(),
                    },
                )
                .await;
        }

        Ok(response)
    }
}

impl std::fmt::Debug for TieredImageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredImageFetcher")
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}
