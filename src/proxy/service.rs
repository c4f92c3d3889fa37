//! Proxy services: the identity fallback and the local caching listener.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::image::PersistentCache;

/// Rewrites request URLs so they go through a proxy.
pub trait ProxyService: Send + Sync {
    /// Returns the URL to request instead of `url`.
    fn proxy(&self, url: &Url) -> Url;

    /// Address the proxy listens on, if it runs a listener.
    fn endpoint(&self) -> Option<SocketAddr> {
        None
    }

    /// Stops the listener, if any. Idempotent.
    fn stop(&self) {}
}

/// The no-op proxy: every URL is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProxy;

impl ProxyService for IdentityProxy {
    fn proxy(&self, url: &Url) -> Url {
        url.clone()
    }
}

/// A local HTTP listener serving arbitrary URLs from the persistent cache.
///
/// `GET /{percent-encoded url}` answers with the cached bytes and their
/// content type.
#[derive(Debug, Clone)]
pub struct HttpProxyService {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl HttpProxyService {
    /// Binds `127.0.0.1:port` and starts serving in the background.
    ///
    /// # Errors
    ///
    /// Returns the bind error, typically `AddrInUse`.
    pub async fn start(cache: Arc<dyn PersistentCache>, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .route("/{*target}", get(serve_cached))
            .with_state(cache);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            match result {
                Ok(()) => debug!("Proxy on {addr} stopped"),
                Err(e) => warn!("Proxy on {addr} failed: {e}"),
            }
        });

        info!("Proxy listening on http://{addr}/");
        Ok(Self { addr, shutdown })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl ProxyService for HttpProxyService {
    fn proxy(&self, url: &Url) -> Url {
        // A serialized Url never contains a literal space, so no '+' appears.
        let encoded: String = byte_serialize(url.as_str().as_bytes()).collect();
        Url::parse(&format!("http://{}/{encoded}", self.addr)).unwrap_or_else(|e| {
            warn!("Could not proxy {url}: {e}");
            url.clone()
        })
    }

    fn endpoint(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }

    fn stop(&self) {
        self.shutdown.cancel();
    }
}

async fn serve_cached(
    State(cache): State<Arc<dyn PersistentCache>>,
    Path(target): Path<String>,
) -> Response {
    let url = match Url::parse(&target) {
        Ok(url) => url,
        Err(e) => {
            debug!("Rejecting proxy request for '{target}': {e}");
            return (StatusCode::BAD_REQUEST, format!("invalid url: {e}")).into_response();
        }
    };

    let entry = match cache.get(&url).await {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Proxy could not serve {url}: {e}");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    let content_type = entry
        .content_type()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let body = entry.body().clone();
    drop(entry);

    ([(CONTENT_TYPE, content_type)], body).into_response()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::error_handling::CacheError;
    use crate::image::CacheEntry;

    struct StaticCache;

    #[async_trait]
    impl PersistentCache for StaticCache {
        async fn get(&self, url: &Url) -> Result<CacheEntry, CacheError> {
            if url.path().ends_with("missing.jpg") {
                return Err(CacheError::NotFound(url.to_string()));
            }
            Ok(CacheEntry::new(
                url.clone(),
                Some("image/gif".to_string()),
                Bytes::from(url.to_string()),
            ))
        }
    }

    #[test]
    fn test_identity_proxy_returns_input() {
        for raw in [
            "https://pr0gramm.com/",
            "http://127.0.0.1:8080/a?b=c#d",
            "https://img.pr0gramm.com/2024/01/01/a%20b.jpg",
        ] {
            let url = Url::parse(raw).unwrap();
            assert_eq!(IdentityProxy.proxy(&url), url);
        }
        assert_eq!(IdentityProxy.endpoint(), None);
    }

    #[tokio::test]
    async fn test_listener_serves_from_cache() {
        let proxy = HttpProxyService::start(Arc::new(StaticCache), 0).await.unwrap();
        let target = Url::parse("https://img.pr0gramm.com/2024/01/01/a.gif?x=1").unwrap();

        let proxied = proxy.proxy(&target);
        assert_eq!(proxied.host_str(), Some("127.0.0.1"));
        assert_eq!(proxied.port(), Some(proxy.addr().port()));

        let response = reqwest::get(proxied).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "image/gif");
        assert_eq!(response.text().await.unwrap(), target.as_str());

        proxy.stop();
    }

    #[tokio::test]
    async fn test_listener_maps_cache_failure_to_bad_gateway() {
        let proxy = HttpProxyService::start(Arc::new(StaticCache), 0).await.unwrap();
        let target = Url::parse("https://img.pr0gramm.com/missing.jpg").unwrap();

        let response = reqwest::get(proxy.proxy(&target)).await.unwrap();
        assert_eq!(response.status(), 502);

        proxy.stop();
    }

    #[tokio::test]
    async fn test_listener_rejects_non_url_path() {
        let proxy = HttpProxyService::start(Arc::new(StaticCache), 0).await.unwrap();

        let response = reqwest::get(format!("http://{}/not-a-url", proxy.addr()))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        proxy.stop();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_an_error() {
        let taken = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = HttpProxyService::start(Arc::new(StaticCache), port)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }
}
