//! On-disk response store.
//!
//! Each response lives in one file named after the SHA-256 of its URL: a
//! JSON header line (URL, status, headers, expiry) followed by the raw body.
//! When the directory grows past its byte budget, the oldest files go first.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, TRANSFER_ENCODING};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use url::Url;

use crate::config::DISK_CACHE_ENTRY_EXT;
use crate::error_handling::CacheError;

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    stored_at: i64,
    expires_at: i64,
}

/// A response read back from disk.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn into_response(self) -> reqwest::Response {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        reqwest::Response::from(response)
    }
}

/// Byte-bounded response store in a single directory.
///
/// Reads are lock-free; writes and eviction are serialized.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    budget: u64,
    writes: Mutex<()>,
}

impl DiskCache {
    /// Opens (creating if needed) the store at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, budget: u64) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            budget,
            writes: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    fn path_for(&self, url: &Url) -> PathBuf {
        let key = Sha256::digest(url.as_str().as_bytes());
        self.dir.join(format!("{key:x}.{DISK_CACHE_ENTRY_EXT}"))
    }

    /// Returns the fresh response stored for `url`, if any.
    ///
    /// Expired and unreadable entries are deleted.
    pub async fn get(&self, url: &Url) -> Result<Option<StoredResponse>, CacheError> {
        let path = self.path_for(url);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (header, body) = match decode(raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                remove_quietly(&path).await;
                return Err(e);
            }
        };
        if header.url != url.as_str() {
            return Ok(None);
        }
        if Utc::now().timestamp() >= header.expires_at {
            debug!("Dropping expired disk cache entry for {url}");
            remove_quietly(&path).await;
            return Ok(None);
        }

        let status = StatusCode::from_u16(header.status)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut headers = HeaderMap::with_capacity(header.headers.len());
        for (name, value) in &header.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        Ok(Some(StoredResponse {
            status,
            headers,
            body,
        }))
    }

    /// Stores a response that stays fresh for `lifetime`.
    ///
    /// Returns `false` without writing if the entry alone exceeds the
    /// budget.
    pub async fn put(
        &self,
        url: &Url,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        lifetime: Duration,
    ) -> Result<bool, CacheError> {
        let now = Utc::now().timestamp();
        let header = EntryHeader {
            url: url.to_string(),
            status: status.as_u16(),
            headers: headers
                .iter()
                .filter(|(name, _)| !is_hop_by_hop(name))
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect(),
            stored_at: now,
            expires_at: now
                .saturating_add(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX)),
        };

        let mut raw = serde_json::to_vec(&header)?;
        raw.push(b'\n');
        if (raw.len() + body.len()) as u64 > self.budget {
            debug!(
                "Not caching {url} on disk: {} bytes exceed the budget",
                body.len()
            );
            return Ok(false);
        }
        raw.extend_from_slice(body);

        let path = self.path_for(url);
        let tmp = path.with_extension("tmp");

        let _guard = self.writes.lock().await;
        tokio::fs::write(&tmp, &raw).await?;
        tokio::fs::rename(&tmp, &path).await?;
        self.evict(&path).await?;
        Ok(true)
    }

    /// Total bytes of all stored entries.
    pub async fn size(&self) -> Result<u64, CacheError> {
        Ok(self.scan().await?.iter().map(|(_, len, _)| len).sum())
    }

    async fn scan(&self) -> Result<Vec<(SystemTime, u64, PathBuf)>, CacheError> {
        let mut found = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension() != Some(OsStr::new(DISK_CACHE_ENTRY_EXT)) {
                continue;
            }
            // Entries can vanish under a concurrent eviction.
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, metadata.len(), path));
        }
        Ok(found)
    }

    async fn evict(&self, keep: &Path) -> Result<(), CacheError> {
        let mut entries = self.scan().await?;
        let mut total: u64 = entries.iter().map(|(_, len, _)| len).sum();
        if total <= self.budget {
            return Ok(());
        }

        entries.retain(|(_, _, path)| path != keep);
        entries.sort_by_key(|(modified, _, _)| *modified);

        let mut evicted = 0usize;
        for (_, len, path) in entries {
            if total <= self.budget {
                break;
            }
            remove_quietly(&path).await;
            total = total.saturating_sub(len);
            evicted += 1;
        }
        debug!("Evicted {evicted} disk cache entries, {total} bytes remain");
        Ok(())
    }
}

/// Headers describing the original connection, not the response.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    *name == CONNECTION || *name == TRANSFER_ENCODING
}

fn decode(raw: Vec<u8>) -> Result<(EntryHeader, Bytes), CacheError> {
    let split = raw.iter().position(|&b| b == b'\n').ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "cache entry has no header line")
    })?;
    let header: EntryHeader = serde_json::from_slice(&raw[..split])?;
    let body = Bytes::from(raw).slice(split + 1..);
    Ok((header, body))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove disk cache entry {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
    use tempfile::tempdir;

    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://pr0gramm.com{path}")).unwrap()
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=600"));
        headers
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024 * 1024).unwrap();
        let target = url("/api/items/get");

        let stored = cache
            .put(
                &target,
                StatusCode::OK,
                &json_headers(),
                b"{\"items\":[]}",
                Duration::from_secs(600),
            )
            .await
            .unwrap();
        assert!(stored);

        let hit = cache.get(&target).await.unwrap().expect("entry should be fresh");
        assert_eq!(hit.status, StatusCode::OK);
        assert_eq!(hit.headers[CONTENT_TYPE], "application/json");
        assert_eq!(hit.body, Bytes::from_static(b"{\"items\":[]}"));

        assert!(cache.get(&url("/api/items/info")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_headers_are_not_stored() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024 * 1024).unwrap();
        let target = url("/api/items/get");
        let mut headers = json_headers();
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        cache
            .put(&target, StatusCode::OK, &headers, b"{}", Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get(&target).await.unwrap().unwrap();
        assert!(hit.headers.get(TRANSFER_ENCODING).is_none());
        assert_eq!(hit.headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024 * 1024).unwrap();
        let target = url("/api/items/get");

        cache
            .put(&target, StatusCode::OK, &json_headers(), b"old", Duration::ZERO)
            .await
            .unwrap();

        assert!(cache.get(&target).await.unwrap().is_none());
        assert_eq!(cache.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oldest_entries_evicted_past_budget() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 2500).unwrap();
        let body = vec![7u8; 1000];

        for name in ["/a", "/b", "/c"] {
            cache
                .put(
                    &url(name),
                    StatusCode::OK,
                    &HeaderMap::new(),
                    &body,
                    Duration::from_secs(600),
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(cache.size().await.unwrap() <= 2500);
        assert!(cache.get(&url("/a")).await.unwrap().is_none());
        assert!(cache.get(&url("/c")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_entry_larger_than_budget_is_skipped() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 100).unwrap();

        let stored = cache
            .put(
                &url("/big"),
                StatusCode::OK,
                &HeaderMap::new(),
                &[0u8; 500],
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert!(!stored);
        assert_eq!(cache.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported_and_removed() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), 1024).unwrap();
        let target = url("/broken");
        std::fs::write(cache.path_for(&target), b"not json\nbody").unwrap();

        let err = cache.get(&target).await.unwrap_err();
        assert!(matches!(err, CacheError::Corrupt(_)));
        assert!(!cache.path_for(&target).exists());
    }

    #[test]
    fn test_open_fails_when_dir_is_a_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = DiskCache::open(&file, 1024).unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
