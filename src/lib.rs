//! pr0gramm_transport library: resilient HTTP transport for the pr0gramm client
//!
//! This library assembles one configured HTTP client out of:
//! - a two-tier DNS resolver that falls back to public DNS when the system
//!   resolver yields no usable address
//! - a local caching proxy started in the background with bounded port retries
//! - a fixed interceptor pipeline (disk response cache, cache override,
//!   user agent, logging, server clock synchronization)
//! - a tiered image fetcher with a byte-bounded in-memory thumbnail cache
//!
//! # Example
//!
//! ```no_run
//! use pr0gramm_transport::{TransportBuilder, TransportConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = TransportBuilder::new(TransportConfig::default()).build()?;
//! let response = transport.get("https://pr0gramm.com/api/items/get").await?;
//! println!("{} (server time {})", response.status(), transport.server_clock().now());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod clock;
pub mod config;
pub mod dns;
mod error_handling;
pub mod http_cache;
pub mod image;
pub mod initialization;
pub mod interceptor;
mod logging;
pub mod proxy;
mod transport;

// Re-export public API
pub use clock::ServerClock;
pub use config::{Config, LogFormat, LogLevel, TransportConfig};
pub use dns::{AddressScope, FallbackResolver, ResolvedAddress};
pub use error_handling::{CacheError, DnsError, InitializationError, TransportError};
pub use image::{ImageResponse, PersistentCache, TieredImageFetcher};
pub use initialization::TransportBuilder;
pub use logging::LogBuffer;
pub use proxy::{ProxyBootstrap, ProxyService, ProxyState};
pub use run::{run_fetch, FetchReport, FetchResult};
pub use transport::Transport;

// Internal run module (drives the fetch binary)
mod run {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use chrono::{DateTime, Utc};
    use futures::future::join_all;
    use log::{info, warn};
    use url::Url;

    use crate::config::Config;
    use crate::image::{PassthroughCache, PersistentCache, TieredImageFetcher};
    use crate::initialization::TransportBuilder;
    use crate::proxy::ProxyService;
    use crate::transport::Transport;
    use crate::TransportConfig;

    /// Outcome of fetching one URL.
    #[derive(Debug, Clone)]
    pub struct FetchResult {
        /// The URL as given on the command line
        pub url: String,
        /// HTTP status, if a response arrived
        pub status: Option<u16>,
        /// Body size in bytes (image mode only)
        pub bytes: Option<usize>,
        /// Local proxy URL for this URL, if the proxy is running
        pub proxied: Option<String>,
        /// Error message, if the fetch failed
        pub error: Option<String>,
        /// Wall time of this fetch
        pub elapsed: Duration,
    }

    /// Summary of a fetch run.
    #[derive(Debug, Clone)]
    pub struct FetchReport {
        /// One entry per URL, in input order
        pub results: Vec<FetchResult>,
        /// Corrected server time, if any response carried a usable `Date`
        pub server_time: Option<DateTime<Utc>>,
        /// Address of the local proxy, if it started
        pub proxy: Option<SocketAddr>,
        /// Total run time in seconds
        pub elapsed_seconds: f64,
    }

    impl FetchReport {
        /// Number of URLs that produced a response.
        pub fn successful(&self) -> usize {
            self.results.iter().filter(|r| r.error.is_none()).count()
        }
    }

    /// Fetches every URL in `config` through a freshly built transport.
    ///
    /// Individual fetch failures are recorded in the report, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport cannot be built.
    pub async fn run_fetch(config: Config) -> Result<FetchReport> {
        let start = Instant::now();
        let transport = TransportBuilder::new(TransportConfig::from(&config))
            .build()
            .context("Failed to build transport")?;

        let cache: Arc<dyn PersistentCache> =
            Arc::new(PassthroughCache::new(Arc::new(transport.clone())));
        let bootstrap = (!config.no_proxy).then(|| transport.start_proxy(Arc::clone(&cache)));
        let fetcher = config
            .images
            .then(|| TieredImageFetcher::new(Arc::new(transport.clone()), Arc::clone(&cache)));

        let results = join_all(
            config
                .urls
                .iter()
                .map(|url| fetch_one(&transport, fetcher.as_ref(), url)),
        )
        .await;

        let mut proxy = None;
        if let Some(bootstrap) = bootstrap {
            let service = bootstrap.endpoint().await;
            proxy = service.endpoint();
            info!("Proxy state: {:?}", bootstrap.state());
            service.stop();
        }

        let clock = transport.server_clock();
        let server_time = clock.estimate().map(|_| clock.now());

        Ok(FetchReport {
            results,
            server_time,
            proxy,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }

    async fn fetch_one(
        transport: &Transport,
        fetcher: Option<&TieredImageFetcher>,
        raw: &str,
    ) -> FetchResult {
        let start = Instant::now();
        let mut result = FetchResult {
            url: raw.to_string(),
            status: None,
            bytes: None,
            proxied: None,
            error: None,
            elapsed: Duration::ZERO,
        };

        let outcome = match fetcher {
            Some(fetcher) => match Url::parse(raw) {
                Ok(url) => fetcher.fetch(&url).await.map(|image| {
                    result.status = Some(image.status.as_u16());
                    result.bytes = Some(image.body.len());
                }),
                Err(e) => Err(e.into()),
            },
            None => transport.get(raw).await.map(|response| {
                result.status = Some(response.status().as_u16());
            }),
        };

        if let Err(e) = outcome {
            warn!("Failed to fetch {raw}: {e}");
            result.error = Some(e.to_string());
        }
        result.elapsed = start.elapsed();

        if let Ok(url) = Url::parse(raw) {
            let proxied = transport.proxied(&url).await;
            if proxied != url {
                result.proxied = Some(proxied.to_string());
            }
        }
        result
    }
}
