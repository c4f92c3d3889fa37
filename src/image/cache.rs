//! Persistent cache contract and scoped cache entries.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

use super::fetcher::{Downloader, ImageResponse, ImageSource};
use crate::error_handling::CacheError;

/// Content-addressed byte cache used for full images and by the local proxy.
///
/// Keys are canonical request URLs.
#[async_trait]
pub trait PersistentCache: Send + Sync {
    /// Returns the entry for `url`, filling it from upstream if needed.
    ///
    /// The entry is scoped: dropping it releases whatever the cache holds
    /// for the caller.
    async fn get(&self, url: &Url) -> Result<CacheEntry, CacheError>;
}

type Release = Box<dyn FnOnce() + Send>;

/// A scoped handle to cached bytes.
///
/// The optional release hook runs exactly once, when the entry is dropped.
pub struct CacheEntry {
    url: Url,
    content_type: Option<String>,
    body: Bytes,
    release: Option<Release>,
}

impl CacheEntry {
    pub fn new(url: Url, content_type: Option<String>, body: Bytes) -> Self {
        Self {
            url,
            content_type,
            body,
            release: None,
        }
    }

    /// Registers the hook run when this entry goes out of scope.
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Converts the entry into a successful response. The bytes are shared,
    /// not copied.
    pub fn to_response(&self) -> ImageResponse {
        ImageResponse {
            status: StatusCode::OK,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
            source: ImageSource::Cache,
        }
    }
}

impl Drop for CacheEntry {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("url", &self.url.as_str())
            .field("content_type", &self.content_type)
            .field("len", &self.body.len())
            .finish()
    }
}

/// A cache that stores nothing and fills every entry from a [`Downloader`].
///
/// Used when no disk cache is wired in.
#[derive(Clone)]
pub struct PassthroughCache {
    downloader: Arc<dyn Downloader>,
}

impl PassthroughCache {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl PersistentCache for PassthroughCache {
    async fn get(&self, url: &Url) -> Result<CacheEntry, CacheError> {
        let response = self.downloader.load(url).await?;
        Ok(CacheEntry::new(
            url.clone(),
            response.content_type,
            response.body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);

        let entry = CacheEntry::new(
            Url::parse("https://img.pr0gramm.com/a.jpg").unwrap(),
            Some("image/png".to_string()),
            Bytes::from_static(b"png"),
        )
        .on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let response = entry.to_response();
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(entry);

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type.as_deref(), Some("image/png"));
        assert_eq!(response.body, Bytes::from_static(b"png"));
        assert_eq!(response.source, ImageSource::Cache);
    }

    #[test]
    fn test_entry_without_hook_drops_quietly() {
        let entry = CacheEntry::new(
            Url::parse("https://img.pr0gramm.com/b.jpg").unwrap(),
            None,
            Bytes::new(),
        );
        assert_eq!(entry.content_type(), None);
        assert!(entry.body().is_empty());
    }
}
