//! Per-request logging.

use std::time::Instant;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Request, Response};

use super::{Interceptor, Next};
use crate::error_handling::TransportError;

/// Logs method, URL, elapsed time and status (or error) of every call.
///
/// Never alters the request or the response.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger;

#[async_trait]
impl Interceptor for RequestLogger {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, TransportError> {
        let watch = Instant::now();
        let url = request.url().clone();

        info!("performing {} http request for {url}", request.method());
        match next.run(request).await {
            Ok(response) => {
                info!(
                    "{url} ({}) took {:?}",
                    response.status().as_u16(),
                    watch.elapsed()
                );
                Ok(response)
            }
            Err(e) => {
                warn!("{url} produced error: {e}");
                Err(e)
            }
        }
    }
}
