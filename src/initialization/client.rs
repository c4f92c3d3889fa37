//! Transport construction.
//!
//! `TransportBuilder` assembles the configured client: TLS parameters,
//! timeouts, connection pooling, the fallback DNS resolver and the fixed
//! interceptor pipeline.

use std::sync::Arc;

use log::{debug, warn};
use reqwest::ClientBuilder;

use super::resolver::init_resolver;
use super::tls::init_tls_config;
use crate::clock::ServerClock;
use crate::config::TransportConfig;
use crate::dns::{FallbackResolver, SecondaryLookup, SystemLookup};
use crate::error_handling::InitializationError;
use crate::http_cache::DiskCache;
use crate::interceptor::{
    DebugDelay, Interceptor, NoStore, Pipeline, RequestLogger, ResponseCache, ServerTimeSync,
    UserAgentStamp,
};
use crate::transport::Transport;

/// Builds a [`Transport`].
///
/// Everything set here is fixed for the lifetime of the built transport.
#[derive(Debug, Default)]
pub struct TransportBuilder {
    config: TransportConfig,
    resolver: Option<FallbackResolver>,
    clock: Option<Arc<ServerClock>>,
}

impl TransportBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            resolver: None,
            clock: None,
        }
    }

    /// Replaces the default resolver (system, then `8.8.8.8`).
    pub fn resolver(mut self, resolver: FallbackResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Publishes server time into `clock` instead of a fresh one.
    pub fn server_clock(mut self, clock: Arc<ServerClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the transport.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration, the user agent or the
    /// underlying reqwest client cannot be built.
    pub fn build(self) -> Result<Transport, InitializationError> {
        let config = self.config;
        let resolver = self.resolver.unwrap_or_else(|| {
            FallbackResolver::new(
                Arc::new(SystemLookup),
                Arc::new(SecondaryLookup::new(init_resolver())),
            )
        });
        let clock = self.clock.unwrap_or_default();

        let builder = ClientBuilder::new()
            .use_preconfigured_tls(init_tls_config()?)
            .dns_resolver(Arc::new(resolver))
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.pool_max_idle)
            .pool_idle_timeout(config.pool_idle_timeout)
            .cookie_store(true);
        // Sent data left unacknowledged for this long closes the connection.
        #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
        let builder = builder.tcp_user_timeout(config.write_timeout);
        let client = builder.build()?;

        let pipeline = build_pipeline(&config, &clock)?;
        debug!("Built transport with stages {:?}", pipeline.names());

        Ok(Transport::new(client, pipeline, clock, config))
    }
}

/// Opens the disk response cache, or returns `None` when it is disabled or
/// its directory is unusable.
fn open_disk_cache(config: &TransportConfig) -> Option<DiskCache> {
    let dir = config.cache_dir.as_ref()?;
    if config.disk_cache_bytes == 0 {
        return None;
    }
    match DiskCache::open(dir, config.disk_cache_bytes) {
        Ok(cache) => {
            debug!(
                "Disk response cache at {} ({} bytes)",
                dir.display(),
                config.disk_cache_bytes
            );
            Some(cache)
        }
        Err(e) => {
            warn!("Disk response cache disabled: {e}");
            None
        }
    }
}

/// Stages, outermost first. The delay stage only exists in debug builds.
fn build_pipeline(
    config: &TransportConfig,
    clock: &Arc<ServerClock>,
) -> Result<Pipeline, InitializationError> {
    let mut stages: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(6);

    if cfg!(debug_assertions) && config.debug_delay {
        stages.push(Arc::new(DebugDelay::new(config.primary_host.as_str())));
    }
    if let Some(cache) = open_disk_cache(config) {
        stages.push(Arc::new(ResponseCache::new(Arc::new(cache))));
    }
    stages.push(Arc::new(NoStore::new(config.no_store_hosts.iter().cloned())));
    stages.push(Arc::new(UserAgentStamp::new(&config.user_agent)?));
    stages.push(Arc::new(RequestLogger));
    stages.push(Arc::new(ServerTimeSync::new(
        config.primary_host.as_str(),
        Arc::clone(clock),
    )));

    Ok(Pipeline::new(stages))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn without_disk_cache() -> TransportConfig {
        TransportConfig {
            cache_dir: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_order() {
        let dir = tempdir().unwrap();
        let config = TransportConfig {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let pipeline = build_pipeline(&config, &Arc::new(ServerClock::new())).unwrap();
        assert_eq!(
            pipeline.names(),
            vec![
                "response-cache",
                "no-store",
                "user-agent",
                "logging",
                "server-time"
            ]
        );
    }

    #[test]
    fn test_disk_cache_disabled_without_dir_or_budget() {
        let pipeline =
            build_pipeline(&without_disk_cache(), &Arc::new(ServerClock::new())).unwrap();
        assert_eq!(
            pipeline.names(),
            vec!["no-store", "user-agent", "logging", "server-time"]
        );

        let dir = tempdir().unwrap();
        let config = TransportConfig {
            cache_dir: Some(dir.path().to_path_buf()),
            disk_cache_bytes: 0,
            ..Default::default()
        };
        let pipeline = build_pipeline(&config, &Arc::new(ServerClock::new())).unwrap();
        assert!(!pipeline.names().contains(&"response-cache"));
    }

    #[test]
    fn test_unusable_cache_dir_does_not_fail_build() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let config = TransportConfig {
            cache_dir: Some(file),
            ..Default::default()
        };

        let pipeline = build_pipeline(&config, &Arc::new(ServerClock::new())).unwrap();
        assert_eq!(pipeline.names()[0], "no-store");
    }

    #[test]
    fn test_debug_delay_is_outermost_when_enabled() {
        let config = TransportConfig {
            debug_delay: true,
            ..without_disk_cache()
        };
        let pipeline = build_pipeline(&config, &Arc::new(ServerClock::new())).unwrap();

        if cfg!(debug_assertions) {
            assert_eq!(pipeline.names()[0], "debug-delay");
            assert_eq!(pipeline.len(), 5);
        } else {
            assert_eq!(pipeline.len(), 4);
        }
    }

    #[test]
    fn test_invalid_user_agent_fails_build() {
        let config = TransportConfig {
            user_agent: "line\nbreak".to_string(),
            ..without_disk_cache()
        };
        let err = build_pipeline(&config, &Arc::new(ServerClock::new())).unwrap_err();
        assert!(matches!(err, InitializationError::InvalidUserAgent(_)));
    }

    #[tokio::test]
    async fn test_build_shares_given_clock() {
        let clock = Arc::new(ServerClock::new());
        let transport = TransportBuilder::new(without_disk_cache())
            .server_clock(Arc::clone(&clock))
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(transport.server_clock(), &clock));
        assert_eq!(transport.pipeline().len(), 4);
    }
}
