//! TLS configuration for the transport.
//!
//! Builds a rustls `ClientConfig` whose cipher suites follow a fixed
//! descending preference order, with Mozilla's root store from `webpki-roots`.

use std::sync::Arc;

use rustls::crypto::ring::{cipher_suite, default_provider};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore, SupportedCipherSuite};

use crate::error_handling::InitializationError;

/// Cipher suites offered during the handshake, most preferred first.
pub fn cipher_suites() -> Vec<SupportedCipherSuite> {
    vec![
        cipher_suite::TLS13_AES_128_GCM_SHA256,
        cipher_suite::TLS13_AES_256_GCM_SHA384,
        cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        cipher_suite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ]
}

/// Builds the TLS client configuration.
///
/// - Protocol versions: TLS 1.3, then TLS 1.2
/// - Cipher suites: [`cipher_suites`], in that order
/// - ALPN: `h2`, then `http/1.1`
///
/// # Errors
///
/// Returns `InitializationError::TlsError` if rustls rejects the
/// version/cipher combination.
pub fn init_tls_config() -> Result<ClientConfig, InitializationError> {
    let provider = CryptoProvider {
        cipher_suites: cipher_suites(),
        ..default_provider()
    };

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_root_certificates(root_store)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_suites_prefer_tls13() {
        let suites = cipher_suites();
        assert_eq!(suites.len(), 9);
        assert!(suites[..3]
            .iter()
            .all(|s| s.version().version == rustls::ProtocolVersion::TLSv1_3));
        assert!(suites[3..]
            .iter()
            .all(|s| s.version().version == rustls::ProtocolVersion::TLSv1_2));
    }

    #[test]
    fn test_tls_config_builds() {
        let config = init_tls_config().unwrap();
        assert_eq!(
            config.alpn_protocols,
            vec![b"h2".to_vec(), b"http/1.1".to_vec()]
        );
        assert_eq!(
            config.crypto_provider().cipher_suites.first().map(|s| s.suite()),
            Some(rustls::CipherSuite::TLS13_AES_128_GCM_SHA256)
        );
    }
}
