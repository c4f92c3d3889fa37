//! Keeps volatile hosts out of the shared HTTP cache.

use std::collections::HashSet;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderValue, CACHE_CONTROL};
use reqwest::{Request, Response};

use super::{Interceptor, Next};
use crate::error_handling::TransportError;

/// Overwrites `Cache-Control` with `no-store` on responses from the
/// configured hosts, whatever the upstream caching headers said.
#[derive(Debug, Clone)]
pub struct NoStore {
    hosts: HashSet<String>,
}

impl NoStore {
    /// Creates the stage for the given hostnames (exact match).
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    fn applies_to(&self, request: &Request) -> bool {
        request
            .url()
            .host_str()
            .is_some_and(|host| self.hosts.contains(host))
    }
}

#[async_trait]
impl Interceptor for NoStore {
    fn name(&self) -> &'static str {
        "no-store"
    }

    async fn intercept(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, TransportError> {
        let applies = self.applies_to(&request);
        let url = request.url().clone();

        let mut response = next.run(request).await?;
        if applies {
            debug!("Disable caching for {url}");
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::{get, FakeExchange};
    use super::super::Pipeline;
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline::new(vec![Arc::new(NoStore::new([
            "vid.pr0gramm.com",
            "img.pr0gramm.com",
        ]))])
    }

    #[tokio::test]
    async fn test_configured_host_forced_to_no_store() {
        let exchange = FakeExchange::ok().header("cache-control", "public, max-age=31536000");

        let response = pipeline()
            .execute(&exchange, get("https://img.pr0gramm.com/2024/01/01/abc.jpg"))
            .await
            .unwrap();

        let values: Vec<_> = response.headers().get_all(CACHE_CONTROL).iter().collect();
        assert_eq!(values, vec!["no-store"]);
    }

    #[tokio::test]
    async fn test_configured_host_without_cache_header() {
        let exchange = FakeExchange::ok();

        let response = pipeline()
            .execute(&exchange, get("https://vid.pr0gramm.com/clip.mp4"))
            .await
            .unwrap();

        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_other_hosts_untouched() {
        let exchange = FakeExchange::ok().header("cache-control", "max-age=60");

        let response = pipeline()
            .execute(&exchange, get("https://pr0gramm.com/api/items/get"))
            .await
            .unwrap();

        assert_eq!(response.headers()[CACHE_CONTROL], "max-age=60");
    }

    #[tokio::test]
    async fn test_subdomain_is_not_a_match() {
        let exchange = FakeExchange::ok().header("cache-control", "max-age=60");

        let response = pipeline()
            .execute(&exchange, get("https://cdn.img.pr0gramm.com/a.jpg"))
            .await
            .unwrap();

        assert_eq!(response.headers()[CACHE_CONTROL], "max-age=60");
    }
}
