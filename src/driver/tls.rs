//! TLS upgrade for Bolt connections.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector as TokioTlsConnector;

use super::config::TrustStrategy;
use super::error::{DriverError, DriverResult};

// =============================================================================
// Certificate verifier for TrustAllCertificates
// =============================================================================

/// Accepts any server certificate.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// =============================================================================
// TLS Connector
// =============================================================================

/// Wraps a connected stream in TLS according to a [`TrustStrategy`].
#[derive(Clone)]
pub struct TlsConnector {
    inner: TokioTlsConnector,
}

impl TlsConnector {
    /// Build a connector for the given trust strategy.
    pub fn new(trust: &TrustStrategy) -> DriverResult<Self> {
        let client_config = build_client_config(trust)?;
        Ok(Self {
            inner: TokioTlsConnector::from(Arc::new(client_config)),
        })
    }

    /// Run the TLS handshake over `stream`.
    ///
    /// Any failure is a [`DriverError::Connection`]; negotiation is not retried.
    pub async fn connect<S>(&self, stream: S, server_name: &str) -> DriverResult<TlsStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let dns_name = ServerName::try_from(server_name.to_string()).map_err(|_| {
            DriverError::connection(format!("Invalid TLS server name: {}", server_name))
        })?;

        tracing::debug!(server_name = %server_name, "performing TLS handshake");

        let tls_stream = self
            .inner
            .connect(dns_name, stream)
            .await
            .map_err(|e| DriverError::connection(format!("TLS handshake failed: {}", e)))?;

        tracing::debug!("TLS handshake completed");
        Ok(tls_stream)
    }
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector").finish_non_exhaustive()
    }
}

fn build_client_config(trust: &TrustStrategy) -> DriverResult<ClientConfig> {
    let provider = Arc::new(ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| DriverError::connection(format!("TLS setup failed: {}", e)))?;

    let config = match trust {
        TrustStrategy::TrustAllCertificates => {
            tracing::warn!(
                "certificate validation is disabled; the connection is open to \
                 man-in-the-middle attacks"
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
                .with_no_client_auth()
        }
        TrustStrategy::TrustSystemCas => builder
            .with_root_certificates(RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            })
            .with_no_client_auth(),
        TrustStrategy::TrustCustomCas { certificates } => {
            let mut roots = RootCertStore::empty();
            for der in certificates {
                roots
                    .add(CertificateDer::from(der.clone()))
                    .map_err(|e| DriverError::configuration(format!("Invalid CA certificate: {}", e)))?;
            }
            builder.with_root_certificates(roots).with_no_client_auth()
        }
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_roots() {
        assert!(TlsConnector::new(&TrustStrategy::TrustSystemCas).is_ok());
    }

    #[test]
    fn test_trust_all() {
        assert!(TlsConnector::new(&TrustStrategy::TrustAllCertificates).is_ok());
    }

    #[test]
    fn test_invalid_custom_ca() {
        let trust = TrustStrategy::TrustCustomCas {
            certificates: vec![vec![0x00, 0x01, 0x02]],
        };
        assert!(matches!(
            TlsConnector::new(&trust),
            Err(DriverError::Configuration(_))
        ));
    }
}
