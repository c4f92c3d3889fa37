//! Replays fresh responses from the disk cache.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::CACHE_CONTROL;
use reqwest::{Method, Request, Response, StatusCode};

use super::{Interceptor, Next};
use crate::error_handling::TransportError;
use crate::http_cache::{storable_lifetime, CacheControl, DiskCache};

/// Serves `GET` requests from a [`DiskCache`] and stores cacheable
/// responses on the way back.
///
/// Sits outside `NoStore`, so a forced `no-store` is what this stage sees.
/// A hit never reaches the inner stages or the network.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    store: Arc<DiskCache>,
}

impl ResponseCache {
    pub fn new(store: Arc<DiskCache>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DiskCache> {
        &self.store
    }
}

#[async_trait]
impl Interceptor for ResponseCache {
    fn name(&self) -> &'static str {
        "response-cache"
    }

    async fn intercept(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, TransportError> {
        if request.method() != Method::GET {
            return next.run(request).await;
        }

        let url = request.url().clone();
        let directives = request
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(CacheControl::parse)
            .unwrap_or_default();

        if !directives.no_cache && !directives.no_store {
            match self.store.get(&url).await {
                Ok(Some(stored)) => {
                    debug!("Disk cache hit for {url}");
                    return Ok(stored.into_response());
                }
                Ok(None) => {}
                Err(e) => warn!("Disk cache lookup for {url} failed: {e}"),
            }
        }

        let response = next.run(request).await?;
        if directives.no_store || response.status() != StatusCode::OK {
            return Ok(response);
        }
        let Some(lifetime) = storable_lifetime(response.headers()) else {
            return Ok(response);
        };

        // Buffer the body while keeping status, headers and URL intact.
        let (parts, body) = http::Response::<reqwest::Body>::from(response).into_parts();
        let bytes = Response::from(http::Response::new(body)).bytes().await?;

        if let Err(e) = self
            .store
            .put(&url, parts.status, &parts.headers, &bytes, lifetime)
            .await
        {
            warn!("Failed to store {url} in the disk cache: {e}");
        }

        Ok(Response::from(http::Response::from_parts(parts, bytes)))
    }
}
