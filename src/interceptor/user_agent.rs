//! User-Agent stamping.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, InvalidHeaderValue, USER_AGENT};
use reqwest::{Request, Response};

use super::{Interceptor, Next};
use crate::error_handling::TransportError;

/// Overwrites the outbound `User-Agent` with a fixed, versioned identifier.
#[derive(Debug, Clone)]
pub struct UserAgentStamp {
    value: HeaderValue,
}

impl UserAgentStamp {
    /// Creates the stage.
    ///
    /// # Errors
    ///
    /// Fails if `user_agent` is not a valid header value.
    pub fn new(user_agent: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            value: HeaderValue::from_str(user_agent)?,
        })
    }
}

#[async_trait]
impl Interceptor for UserAgentStamp {
    fn name(&self) -> &'static str {
        "user-agent"
    }

    async fn intercept(
        &self,
        mut request: Request,
        next: Next<'_>,
    ) -> Result<Response, TransportError> {
        request.headers_mut().insert(USER_AGENT, self.value.clone());
        next.run(request).await
    }
}
