//! Artificial latency for surfacing race conditions during development.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use reqwest::{Request, Response};

use super::{Interceptor, Next};
use crate::config::{DEBUG_DELAY_OTHER, DEBUG_DELAY_PRIMARY};
use crate::error_handling::TransportError;

/// Sleeps before every request: longer for the primary host.
///
/// Only wired into the pipeline by debug builds, and only on request.
#[derive(Debug, Clone)]
pub struct DebugDelay {
    primary_host: String,
}

impl DebugDelay {
    /// Creates the stage for the given primary host.
    pub fn new(primary_host: impl Into<String>) -> Self {
        Self {
            primary_host: primary_host.into(),
        }
    }

    fn delay_for(&self, request: &Request) -> Duration {
        if request.url().as_str().contains(&self.primary_host) {
            DEBUG_DELAY_PRIMARY
        } else {
            DEBUG_DELAY_OTHER
        }
    }
}

#[async_trait]
impl Interceptor for DebugDelay {
    fn name(&self) -> &'static str {
        "debug-delay"
    }

    async fn intercept(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, TransportError> {
        let url = request.url().clone();
        let watch = Instant::now();
        tokio::time::sleep(self.delay_for(&request)).await;

        match next.run(request).await {
            Ok(response) => {
                debug!(
                    "Delayed request to {url} took {:?} (status={})",
                    watch.elapsed(),
                    response.status().as_u16()
                );
                Ok(response)
            }
            Err(e) => {
                debug!("Delayed request to {url} took {:?}, error {e}", watch.elapsed());
                Err(e)
            }
        }
    }
}
