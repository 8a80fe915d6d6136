//! IMAP connection setup and TLS helpers
//!
//! [`ImapConnector`] opens one authenticated [`ImapSession`] per call:
//! TCP connect, TLS (implicit or STARTTLS), then LOGIN.

use crate::config::{ServerConfig, TlsMode};
use crate::error::{Error, Result};
use crate::session::{Connector, ImapSession, TlsStream};
use async_trait::async_trait;
use rustls::RootCertStore;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info, warn};

/// Opens sessions against one IMAP server.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: ServerConfig,
}

impl ImapConnector {
    #[must_use]
    pub const fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    async fn handshake(&self, tcp: TcpStream) -> Result<TlsStream> {
        let connector = tls_connector(self.config.accept_invalid_certs)?;
        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| Error::Tls(e.to_string()))?;
        Ok(tls.compat())
    }
}

#[async_trait]
impl Connector for ImapConnector {
    type Session = ImapSession;

    async fn connect(&self) -> Result<ImapSession> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("Connecting to IMAP server at {} ({})", addr, self.config.tls);

        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Connection(format!("{addr}: {e}")))?;

        let client = match self.config.tls {
            TlsMode::Implicit => {
                let mut client = async_imap::Client::new(self.handshake(tcp).await?);
                read_greeting(&mut client).await?;
                client
            }
            TlsMode::StartTls => {
                let mut plain = async_imap::Client::new(tcp.compat());
                read_greeting(&mut plain).await?;
                plain
                    .run_command_and_check_ok("STARTTLS", None)
                    .await
                    .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
                // No second greeting follows the upgrade.
                let tcp = plain.into_inner().into_inner();
                async_imap::Client::new(self.handshake(tcp).await?)
            }
        };

        let session = client
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|(e, _)| Error::Protocol(format!("Login failed: {e}")))?;

        info!("Connected to IMAP server {}", addr);
        Ok(ImapSession::new(session))
    }
}

async fn read_greeting<T>(client: &mut async_imap::Client<T>) -> Result<()>
where
    T: futures::AsyncRead + futures::AsyncWrite + Unpin + std::fmt::Debug + Send,
{
    match client.read_response().await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(Error::Connection("Connection closed before greeting".into())),
        Err(e) => Err(Error::Connection(format!("Failed to read greeting: {e}"))),
    }
}

/// Build a TLS connector with the platform trust store, or one that
/// accepts any certificate when `accept_invalid_certs` is set.
fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| Error::Tls(e.to_string()))?;

    let config = if accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        builder
            .with_root_certificates(native_roots()?)
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

fn native_roots() -> Result<RootCertStore> {
    let certs = rustls_native_certs::load_native_certs()
        .map_err(|e| Error::Tls(format!("Failed to load native certificates: {e}")))?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    debug!("Loaded {} native root certificates ({} ignored)", added, ignored);
    if roots.is_empty() {
        return Err(Error::Tls("No usable root certificates found".into()));
    }
    Ok(roots)
}

/// Certificate verifier that accepts all certificates (self-signed
/// local bridges and test servers).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
