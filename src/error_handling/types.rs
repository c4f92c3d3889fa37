//! Error type definitions.
//!
//! This module defines all error types used throughout the transport layer.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error building the TLS configuration.
    #[error("TLS configuration error: {0}")]
    TlsError(#[from] rustls::Error),

    /// The configured User-Agent is not a valid header value.
    #[error("Invalid User-Agent: {0}")]
    InvalidUserAgent(#[from] reqwest::header::InvalidHeaderValue),
}

/// Error types for hostname resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Neither the system nor the secondary resolver produced an address.
    #[error("Could not resolve host '{host}'")]
    ResolutionFailed {
        /// The hostname that could not be resolved
        host: String,
    },

    /// A resolver failed for a reason other than "no such host".
    #[error("DNS lookup failed: {0}")]
    Lookup(String),

    /// The resolver is not in a usable state (internal initialization fault).
    #[error("DNS resolver unavailable: {0}")]
    ResolverUnavailable(String),
}

/// Error types for the persistent cache collaborator and the disk
/// response cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache could not produce an entry for this URL.
    #[error("No cache entry for {0}")]
    NotFound(String),

    /// Reading or writing cached bytes failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored response header could not be decoded.
    #[error("Corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Filling the cache through the transport failed.
    #[error("Cache fill error: {0}")]
    Upstream(#[source] Box<TransportError>),
}

impl From<TransportError> for CacheError {
    fn from(err: TransportError) -> Self {
        CacheError::Upstream(Box::new(err))
    }
}

/// Errors surfaced to callers of the transport.
///
/// Only resolution failures and network errors reach callers; every other
/// condition in the transport degrades without an error.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP exchange failed (connect, timeout, body, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    /// Hostname resolution failed on both resolvers.
    #[error(transparent)]
    Dns(#[from] DnsError),

    /// The persistent cache failed to produce an entry.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The request URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    /// Returns `true` if the failure happened before a connection was made.
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_connect(),
            TransportError::Dns(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_failed_message_names_host() {
        let err = DnsError::ResolutionFailed {
            host: "nope.invalid".to_string(),
        };
        assert_eq!(err.to_string(), "Could not resolve host 'nope.invalid'");
    }

    #[test]
    fn test_dns_error_is_transparent_in_transport_error() {
        let err = TransportError::from(DnsError::ResolutionFailed {
            host: "nope.invalid".to_string(),
        });
        assert_eq!(err.to_string(), "Could not resolve host 'nope.invalid'");
        assert!(err.is_connect());
    }

    #[test]
    fn test_cache_error_not_connect() {
        let err = TransportError::from(CacheError::NotFound("https://x/".to_string()));
        assert!(!err.is_connect());
        assert!(err.to_string().contains("https://x/"));
    }

    #[test]
    fn test_io_error_converts_into_cache_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = CacheError::from(io);
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_invalid_url_conversion() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = TransportError::from(parse_err);
        assert!(err.to_string().starts_with("Invalid URL"));
    }
}
