//! TLS connector for establishing encrypted connections to SQL Server.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector as TokioTlsConnector;

use crate::config::{TlsConfig, TlsVersion};
use crate::error::TlsError;
use crate::prelogin_wrapper::TlsPreloginWrapper;

/// A certificate verifier that accepts any server certificate.
///
/// **WARNING:** insecure, `TrustServerCertificate=true` only. Exposes the
/// connection to man-in-the-middle attacks.
#[derive(Debug)]
struct DangerousServerCertVerifier;

impl ServerCertVerifier for DangerousServerCertVerifier {
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
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

/// Secure default TLS client configuration: Mozilla's root store, no client
/// certificate.
pub fn default_tls_config() -> Result<ClientConfig, TlsError> {
    let root_store = RootCertStore { roots: webpki_roots::TLS_SERVER_ROOTS.to_vec() };
    Ok(ClientConfig::builder().with_root_certificates(root_store).with_no_client_auth())
}

/// Clone a private key out of its `Arc`. `PrivateKeyDer` itself doesn't
/// implement `Clone`, so [`crate::config::ClientAuth`] holds it behind an
/// `Arc` and each variant has to be cloned through its own `clone_key`.
fn clone_private_key(key: &PrivateKeyDer<'static>) -> Result<PrivateKeyDer<'static>, TlsError> {
    match key {
        PrivateKeyDer::Pkcs1(k) => Ok(PrivateKeyDer::Pkcs1(k.clone_key())),
        PrivateKeyDer::Sec1(k) => Ok(PrivateKeyDer::Sec1(k.clone_key())),
        PrivateKeyDer::Pkcs8(k) => Ok(PrivateKeyDer::Pkcs8(k.clone_key())),
        _ => Err(TlsError::Configuration("unsupported private key format".into())),
    }
}

/// TLS connector for SQL Server connections.
///
/// Handles both TDS 7.x (TLS wrapped in `PRE_LOGIN` packet framing during the
/// handshake, transparent afterward) and TDS 8.0 strict mode (TLS runs
/// before any TDS traffic, so no framing is needed).
pub struct TlsConnector {
    config: TlsConfig,
    inner: TokioTlsConnector,
}

impl TlsConnector {
    /// Create a new TLS connector with the given configuration.
    pub fn new(config: TlsConfig) -> Result<Self, TlsError> {
        let client_config = Self::build_client_config(&config)?;
        let inner = TokioTlsConnector::from(Arc::new(client_config));
        Ok(Self { config, inner })
    }

    fn build_client_config(config: &TlsConfig) -> Result<ClientConfig, TlsError> {
        let versions = Self::select_versions(config)?;

        if config.trust_server_certificate {
            tracing::warn!(
                "TrustServerCertificate is enabled - certificate validation is DISABLED. \
                 This is insecure and should only be used for development/testing. \
                 Connections are vulnerable to man-in-the-middle attacks."
            );
            return Ok(ClientConfig::builder_with_protocol_versions(&versions)
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(DangerousServerCertVerifier))
                .with_no_client_auth());
        }

        let root_store = Self::build_root_store(config)?;
        let builder =
            ClientConfig::builder_with_protocol_versions(&versions).with_root_certificates(root_store);

        let client_config = if let Some(client_auth) = &config.client_auth {
            let key = clone_private_key(&client_auth.key)?;
            builder
                .with_client_auth_cert(client_auth.certificates.clone(), key)
                .map_err(|e| TlsError::Configuration(format!("client auth setup failed: {e}")))?
        } else {
            builder.with_no_client_auth()
        };

        Ok(client_config)
    }

    fn build_root_store(config: &TlsConfig) -> Result<RootCertStore, TlsError> {
        let mut root_store = RootCertStore::empty();

        if config.root_certificates.is_empty() {
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        } else {
            for cert in &config.root_certificates {
                root_store.add(cert.clone()).map_err(|e| TlsError::InvalidCertificate(e.to_string()))?;
            }
        }

        Ok(root_store)
    }

    /// Select the rustls protocol versions allowed by `[min, max]`. Returns
    /// an error rather than silently widening the range if the bounds leave
    /// nothing selectable — a caller who asked for `min: Tls13` should never
    /// end up connecting over TLS 1.2.
    fn select_versions(
        config: &TlsConfig,
    ) -> Result<Vec<&'static rustls::SupportedProtocolVersion>, TlsError> {
        config.validate()?;

        let mut versions = Vec::new();
        if config.min_protocol_version <= TlsVersion::Tls12 && config.max_protocol_version >= TlsVersion::Tls12 {
            versions.push(&rustls::version::TLS12);
        }
        if config.min_protocol_version <= TlsVersion::Tls13 && config.max_protocol_version >= TlsVersion::Tls13 {
            versions.push(&rustls::version::TLS13);
        }

        Ok(versions)
    }

    /// Connect and perform the TLS handshake over `stream`.
    ///
    /// In TDS 7.x mode the handshake bytes are wrapped in `PRE_LOGIN` packet
    /// framing via [`TlsPreloginWrapper`]; once the handshake completes the
    /// wrapper becomes a transparent pass-through, since all TDS traffic
    /// after that point is already flowing inside the encrypted channel. In
    /// TDS 8.0 strict mode the wrapper is put in pass-through mode up front,
    /// since TLS runs directly over the raw connection with no framing.
    pub async fn connect<S>(
        &self,
        stream: S,
        server_name: &str,
    ) -> Result<TlsStream<TlsPreloginWrapper<S>>, TlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let server_name = self.config.server_name.as_deref().unwrap_or(server_name);
        let dns_name = ServerName::try_from(server_name.to_string()).map_err(|_| {
            TlsError::HostnameVerification {
                expected: server_name.to_string(),
                actual: "invalid DNS name".to_string(),
            }
        })?;

        let mut wrapper = TlsPreloginWrapper::new(stream);
        if self.config.strict_mode {
            wrapper.handshake_complete();
        }

        tracing::debug!(server_name = %server_name, strict_mode = self.config.strict_mode, "performing TLS handshake");

        let mut tls_stream = self
            .inner
            .connect(dns_name, wrapper)
            .await
            .map_err(|e| TlsError::HandshakeFailed(e.to_string()))?;

        tls_stream.get_mut().0.handshake_complete();

        tracing::debug!("TLS handshake completed successfully");
        Ok(tls_stream)
    }

    /// Whether this connector is configured for TDS 8.0 strict mode.
    #[must_use]
    pub fn is_strict_mode(&self) -> bool {
        self.config.strict_mode
    }

    /// The underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TlsConfig {
        &self.config
    }
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_crypto_provider() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    #[test]
    fn default_config_builds_a_connector() {
        setup_crypto_provider();
        assert!(TlsConnector::new(TlsConfig::default()).is_ok());
    }

    #[test]
    fn trust_server_certificate_does_not_imply_strict_mode() {
        setup_crypto_provider();
        let config = TlsConfig::new().trust_server_certificate(true);
        let connector = TlsConnector::new(config).unwrap();
        assert!(!connector.is_strict_mode());
    }

    #[test]
    fn strict_mode_flag_is_reported_back() {
        setup_crypto_provider();
        let config = TlsConfig::new().strict_mode(true);
        let connector = TlsConnector::new(config).unwrap();
        assert!(connector.is_strict_mode());
    }

    #[test]
    fn inverted_version_bounds_are_rejected_instead_of_silently_widened() {
        setup_crypto_provider();
        let config = TlsConfig::new()
            .min_protocol_version(TlsVersion::Tls13)
            .max_protocol_version(TlsVersion::Tls12);
        assert!(TlsConnector::new(config).is_err());
    }

    #[test]
    fn tls13_only_config_selects_a_single_version() {
        setup_crypto_provider();
        let config = TlsConfig::new()
            .min_protocol_version(TlsVersion::Tls13)
            .max_protocol_version(TlsVersion::Tls13);
        let versions = TlsConnector::select_versions(&config).unwrap();
        assert_eq!(versions.len(), 1);
    }
}
