//! Server clock synchronization from response `Date` headers.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use reqwest::header::DATE;
use reqwest::{Request, Response};

use super::{Interceptor, Next};
use crate::clock::ServerClock;
use crate::error_handling::TransportError;

/// IMF-fixdate, the only `Date` format accepted.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parses an HTTP `Date` header strictly.
///
/// Obsolete formats, other zones and inconsistent weekdays are rejected.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Feeds successful primary-host responses into the [`ServerClock`].
///
/// The published estimate is the `Date` value plus half the observed round
/// trip. Unparseable dates leave the clock untouched.
#[derive(Debug, Clone)]
pub struct ServerTimeSync {
    primary_host: String,
    clock: Arc<ServerClock>,
}

impl ServerTimeSync {
    /// Creates the stage for `primary_host`, publishing into `clock`.
    pub fn new(primary_host: impl Into<String>, clock: Arc<ServerClock>) -> Self {
        Self {
            primary_host: primary_host.into(),
            clock,
        }
    }
}

#[async_trait]
impl Interceptor for ServerTimeSync {
    fn name(&self) -> &'static str {
        "server-time"
    }

    async fn intercept(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, TransportError> {
        let is_primary = request.url().host_str() == Some(self.primary_host.as_str());

        let started = Instant::now();
        let response = next.run(request).await?;
        let elapsed = started.elapsed();

        if is_primary && response.status().is_success() {
            let server_time = response
                .headers()
                .get(DATE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_http_date);

            if let Some(server_time) = server_time {
                let half_trip = chrono::Duration::from_std(elapsed / 2).unwrap_or_default();
                self.clock.update(server_time + half_trip);
            } else {
                debug!("No usable Date header from {}", self.primary_host);
            }
        }

        Ok(response)
    }
}
