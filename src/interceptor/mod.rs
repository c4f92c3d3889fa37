//! Ordered request/response interceptor pipeline.
//!
//! Every outbound call passes through the same fixed chain of stages. Each
//! stage receives the request and a [`Next`] handle that runs the rest of the
//! chain; the last handle runs the network exchange itself.
//!
//! Stages, outermost first:
//! 1. `DebugDelay` (debug builds only, opt-in)
//! 2. `ResponseCache` (disk cache, when configured)
//! 3. `NoStore` (forces `Cache-Control: no-store` for configured hosts)
//! 4. `UserAgentStamp`
//! 5. `RequestLogger`
//! 6. `ServerTimeSync`
//!
//! `NoStore` rewrites the response before `ResponseCache` sees it, so the
//! forced header decides what gets stored. A disk hit ends the chain at
//! `ResponseCache`.
//!
//! A stage never swallows an error coming from inside the chain.

mod debug_delay;
mod logging;
mod no_store;
mod response_cache;
mod server_time;
mod user_agent;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::error_handling::TransportError;

pub use debug_delay::DebugDelay;
pub use logging::RequestLogger;
pub use no_store::NoStore;
pub use response_cache::ResponseCache;
pub use server_time::{parse_http_date, ServerTimeSync};
pub use user_agent::UserAgentStamp;

/// The innermost step of the chain: performs the actual exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Sends `request` and returns the response.
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

/// One named stage of the pipeline.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Stable name used in logs and for introspection.
    fn name(&self) -> &'static str;

    /// Transforms the request, runs the remaining chain via `next`, and
    /// transforms the response.
    async fn intercept(&self, request: Request, next: Next<'_>)
        -> Result<Response, TransportError>;
}

/// Handle to the remainder of the chain.
pub struct Next<'a> {
    exchange: &'a dyn Exchange,
    rest: &'a [Arc<dyn Interceptor>],
}

impl Next<'_> {
    /// Runs the remaining stages, then the exchange.
    pub async fn run(self, request: Request) -> Result<Response, TransportError> {
        match self.rest.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    exchange: self.exchange,
                    rest,
                };
                stage.intercept(request, next).await
            }
            None => self.exchange.execute(request).await,
        }
    }
}

/// A fixed, ordered sequence of interceptors.
///
/// The order is set at construction and cannot change afterwards.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Arc<Vec<Arc<dyn Interceptor>>>,
}

impl Pipeline {
    /// Creates a pipeline; `stages[0]` is the outermost stage.
    pub fn new(stages: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            stages: Arc::new(stages),
        }
    }

    /// Stage names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if requests go straight to the exchange.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `request` through every stage and finally `exchange`.
    ///
    /// # Errors
    ///
    /// Returns whatever error the exchange or a stage produced, unchanged.
    pub async fn execute(
        &self,
        exchange: &dyn Exchange,
        request: Request,
    ) -> Result<Response, TransportError> {
        Next {
            exchange,
            rest: self.stages.as_slice(),
        }
        .run(request)
        .await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .finish()
    }
}
