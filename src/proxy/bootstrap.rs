//! Single-flight proxy startup with bounded port retries.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{error, info, warn};
use rand::Rng;

use super::service::{HttpProxyService, IdentityProxy, ProxyService};
use crate::config::{PROXY_MAX_ATTEMPTS, PROXY_PORT_MAX, PROXY_PORT_MIN};
use crate::image::PersistentCache;

/// Lifecycle of the proxy bootstrap.
///
/// Moves forward only; `Running` and `Unavailable` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    NotStarted,
    Starting { attempt: usize },
    Running(SocketAddr),
    Unavailable,
}

/// Starts one proxy instance on a given port.
#[async_trait]
pub trait ProxyFactory: Send + Sync + 'static {
    async fn start(&self, port: u16) -> io::Result<Arc<dyn ProxyService>>;
}

/// Starts [`HttpProxyService`] listeners backed by a persistent cache.
#[derive(Clone)]
pub struct HttpProxyFactory {
    cache: Arc<dyn PersistentCache>,
}

impl HttpProxyFactory {
    pub fn new(cache: Arc<dyn PersistentCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ProxyFactory for HttpProxyFactory {
    async fn start(&self, port: u16) -> io::Result<Arc<dyn ProxyService>> {
        let service = HttpProxyService::start(Arc::clone(&self.cache), port).await?;
        Ok(Arc::new(service))
    }
}

type SharedProxy = Shared<BoxFuture<'static, Arc<dyn ProxyService>>>;

/// The process-wide proxy endpoint, computed once in the background.
///
/// [`ProxyBootstrap::spawn`] starts the attempt sequence on a tokio worker
/// right away; every caller of [`ProxyBootstrap::endpoint`] awaits that same
/// computation. When all attempts fail the result is [`IdentityProxy`].
#[derive(Clone)]
pub struct ProxyBootstrap {
    state: Arc<Mutex<ProxyState>>,
    endpoint: SharedProxy,
}

impl ProxyBootstrap {
    /// Starts bootstrapping with `factory`. Must be called inside a tokio
    /// runtime.
    pub fn spawn<F: ProxyFactory>(factory: F) -> Self {
        let state = Arc::new(Mutex::new(ProxyState::NotStarted));
        let task = tokio::spawn(run_attempts(factory, Arc::clone(&state)));

        let task_state = Arc::clone(&state);
        let endpoint = async move {
            match task.await {
                Ok(proxy) => proxy,
                Err(e) => {
                    error!("Proxy bootstrap task failed: {e}");
                    set_state(&task_state, ProxyState::Unavailable);
                    Arc::new(IdentityProxy) as Arc<dyn ProxyService>
                }
            }
        }
        .boxed()
        .shared();

        Self { state, endpoint }
    }

    /// Waits for the bootstrap to finish and returns the resulting proxy.
    pub async fn endpoint(&self) -> Arc<dyn ProxyService> {
        self.endpoint.clone().await
    }

    pub fn state(&self) -> ProxyState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ProxyBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBootstrap")
            .field("state", &self.state())
            .finish()
    }
}

fn set_state(state: &Mutex<ProxyState>, next: ProxyState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}

fn random_port() -> u16 {
    rand::rng().random_range(PROXY_PORT_MIN..PROXY_PORT_MAX)
}

async fn run_attempts<F: ProxyFactory>(
    factory: F,
    state: Arc<Mutex<ProxyState>>,
) -> Arc<dyn ProxyService> {
    for attempt in 1..=PROXY_MAX_ATTEMPTS {
        set_state(&state, ProxyState::Starting { attempt });
        let port = random_port();

        match factory.start(port).await {
            Ok(proxy) => {
                let endpoint = proxy
                    .endpoint()
                    .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
                info!("Started proxy on {endpoint} after {attempt} attempt(s)");
                set_state(&state, ProxyState::Running(endpoint));
                return proxy;
            }
            Err(e) => warn!("Could not start proxy on port {port} (attempt {attempt}): {e}"),
        }
    }

    warn!("Stop trying, using no proxy now.");
    set_state(&state, ProxyState::Unavailable);
    Arc::new(IdentityProxy)
}
