//! The configured HTTP client handed to consumers.

use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use tokio_retry::strategy::FixedInterval;
use url::Url;

use crate::clock::ServerClock;
use crate::config::{TransportConfig, CONNECT_RETRY_ATTEMPTS, CONNECT_RETRY_DELAY_MS};
use crate::error_handling::{DnsError, TransportError};
use crate::image::{Downloader, ImageResponse, ImageSource, PersistentCache};
use crate::interceptor::{Exchange, Pipeline};
use crate::proxy::{HttpProxyFactory, ProxyBootstrap};

/// Sends requests with reqwest, retrying once on connection failure.
pub(crate) struct NetworkExchange {
    client: Client,
    retry_on_connection_failure: bool,
}

impl NetworkExchange {
    pub(crate) fn new(client: Client, retry_on_connection_failure: bool) -> Self {
        Self {
            client,
            retry_on_connection_failure,
        }
    }
}

#[async_trait]
impl Exchange for NetworkExchange {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let retries = if self.retry_on_connection_failure {
            CONNECT_RETRY_ATTEMPTS
        } else {
            0
        };
        let mut delays = FixedInterval::from_millis(CONNECT_RETRY_DELAY_MS).take(retries);
        let mut request = request;

        loop {
            // Streaming bodies cannot be replayed.
            let replay = request.try_clone();
            let url = request.url().clone();

            match self.client.execute(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() => match (replay, delays.next()) {
                    (Some(next), Some(delay)) => {
                        debug!("Connection to {url} failed, retrying: {e}");
                        tokio::time::sleep(delay).await;
                        request = next;
                    }
                    _ => return Err(classify(e)),
                },
                Err(e) => return Err(classify(e)),
            }
        }
    }
}

/// Surfaces resolver failures as [`TransportError::Dns`].
fn classify(err: reqwest::Error) -> TransportError {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(dns) = inner.downcast_ref::<DnsError>() {
            return TransportError::Dns(dns.clone());
        }
        source = inner.source();
    }
    TransportError::Http(err)
}

struct Inner {
    client: Client,
    exchange: NetworkExchange,
    pipeline: Pipeline,
    clock: Arc<ServerClock>,
    config: TransportConfig,
    proxy: OnceLock<ProxyBootstrap>,
}

/// A configured client: DNS fallback, TLS, pooling and the interceptor
/// pipeline are pre-wired.
///
/// Cheap to clone; clones share the connection pool and the server clock.
/// Built by [`crate::TransportBuilder`].
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl Transport {
    pub(crate) fn new(
        client: Client,
        pipeline: Pipeline,
        clock: Arc<ServerClock>,
        config: TransportConfig,
    ) -> Self {
        let exchange = NetworkExchange::new(client.clone(), config.retry_on_connection_failure);
        Self {
            inner: Arc::new(Inner {
                client,
                exchange,
                pipeline,
                clock,
                config,
                proxy: OnceLock::new(),
            }),
        }
    }

    /// Sends `request` through the interceptor pipeline.
    ///
    /// # Errors
    ///
    /// Resolution failures surface as [`TransportError::Dns`], every other
    /// network failure as [`TransportError::Http`]. Non-2xx statuses are
    /// not errors.
    pub async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        self.inner
            .pipeline
            .execute(&self.inner.exchange, request)
            .await
    }

    /// Builds and sends a request prepared with [`Transport::request`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        self.execute(builder.build()?).await
    }

    /// `GET url`.
    pub async fn get(&self, url: &str) -> Result<Response, TransportError> {
        let url = Url::parse(url)?;
        self.execute(Request::new(Method::GET, url)).await
    }

    /// Starts a request builder bound to this client. Send it with
    /// [`Transport::send`] so it passes through the pipeline.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.client.request(method, url)
    }

    /// Starts the local caching proxy in the background, serving from
    /// `cache`.
    ///
    /// The proxy is started at most once per transport (and its clones).
    /// Later calls return the first bootstrap and ignore `cache`. Use
    /// [`Transport::proxied`] to route a URL through it.
    pub fn start_proxy(&self, cache: Arc<dyn PersistentCache>) -> ProxyBootstrap {
        self.inner
            .proxy
            .get_or_init(|| ProxyBootstrap::spawn(HttpProxyFactory::new(cache)))
            .clone()
    }

    /// Returns the URL to request instead of `url`: the local proxy's URL
    /// for it once the proxy runs, or `url` itself when no proxy was
    /// started or none could bind.
    ///
    /// Waits for a bootstrap that is still in progress.
    pub async fn proxied(&self, url: &Url) -> Url {
        match self.inner.proxy.get() {
            Some(bootstrap) => bootstrap.endpoint().await.proxy(url),
            None => url.clone(),
        }
    }

    /// The proxy bootstrap, if [`Transport::start_proxy`] was called.
    pub fn proxy(&self) -> Option<&ProxyBootstrap> {
        self.inner.proxy.get()
    }

    pub fn server_clock(&self) -> &Arc<ServerClock> {
        &self.inner.clock
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("pipeline", &self.inner.pipeline)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Downloader for Transport {
    async fn load(&self, url: &Url) -> Result<ImageResponse, TransportError> {
        let response = self
            .execute(Request::new(Method::GET, url.clone()))
            .await?
            .error_for_status()
            .inspect_err(|e| warn!("Image download failed: {e}"))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(ImageResponse {
            status,
            content_type,
            body,
            source: ImageSource::Network,
        })
    }
}
