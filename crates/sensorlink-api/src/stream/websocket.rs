// tokio-tungstenite connector
//
// Opens the socket, then splits it: reads are adapted into a stream of
// `TransportEvent`s, writes go through an unbounded queue drained by a
// small writer task that closes the sink once every sender is dropped.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt, future};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{self, CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use url::Url;

use super::{Connection, Connector, TransportEvent};
use crate::error::Error;
use crate::transport::TlsMode;

/// Opens device streams over WebSocket.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    bearer: Option<SecretString>,
    tls: TlsMode,
}

impl WsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `Authorization: Bearer ..` on the upgrade request.
    pub fn with_bearer(mut self, token: Option<SecretString>) -> Self {
        self.bearer = token;
        self
    }

    /// Certificate handling for `wss://` targets. Matches the REST client.
    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn tls(&self) -> &TlsMode {
        &self.tls
    }

    /// rustls connector for the configured mode. `None` keeps the
    /// tungstenite default (webpki roots).
    fn tls_connector(&self) -> Result<Option<tokio_tungstenite::Connector>, Error> {
        let provider = Arc::new(crypto::ring::default_provider());
        let config = match &self.tls {
            TlsMode::System => return Ok(None),
            TlsMode::CustomCa(path) => rustls_builder(&provider)?
                .with_root_certificates(roots_with_ca(path)?)
                .with_no_client_auth(),
            TlsMode::DangerAcceptInvalid => rustls_builder(&provider)?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCert {
                    algorithms: provider.signature_verification_algorithms,
                }))
                .with_no_client_auth(),
        };

        Ok(Some(tokio_tungstenite::Connector::Rustls(Arc::new(config))))
    }
}

impl Connector for WsConnector {
    async fn open(&self, url: &Url) -> Result<Connection, Error> {
        tracing::info!(url = %url, "connecting to stream");

        let uri: tungstenite::http::Uri = url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;

        let mut request = ClientRequestBuilder::new(uri);
        if let Some(token) = &self.bearer {
            request = request.with_header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            );
        }

        let connector = self.tls_connector()?;
        let (ws_stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector)
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("stream connected");

        let (mut write, read) = ws_stream.split();
        let (outbound, mut queue) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = queue.recv().await {
                if let Err(e) = write.send(tungstenite::Message::Text(text.into())).await {
                    tracing::debug!(error = %e, "stream write failed");
                    break;
                }
            }
            let _ = write.close().await;
            tracing::trace!("stream writer exiting");
        });

        let inbound = read
            .filter_map(|frame| future::ready(translate(frame)))
            .boxed();

        Ok(Connection { inbound, outbound })
    }
}

fn rustls_builder(
    provider: &Arc<CryptoProvider>,
) -> Result<rustls::ConfigBuilder<rustls::ClientConfig, rustls::WantsVerifier>, Error> {
    rustls::ClientConfig::builder_with_provider(Arc::clone(provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("unsupported TLS configuration: {e}")))
}

/// webpki roots plus every certificate in the PEM file at `path`.
fn roots_with_ca(path: &std::path::Path) -> Result<RootCertStore, Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
    for cert in certs {
        let cert = cert.map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
    }
    Ok(roots)
}

/// Skips chain validation for self-signed lab gateways. Handshake
/// signatures are still checked.
#[derive(Debug)]
struct AcceptAnyCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyCert {
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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

fn translate(
    frame: Result<tungstenite::Message, tungstenite::Error>,
) -> Option<TransportEvent> {
    match frame {
        Ok(tungstenite::Message::Text(text)) => Some(TransportEvent::Text(text.to_string())),
        Ok(tungstenite::Message::Close(frame)) => {
            let (code, reason) = frame
                .map(|cf| (Some(u16::from(cf.code)), cf.reason.to_string()))
                .unwrap_or_default();
            Some(TransportEvent::Closed { code, reason })
        }
        Ok(tungstenite::Message::Ping(_)) => {
            // tungstenite answers pings itself
            tracing::trace!("stream ping");
            None
        }
        // Binary, Pong, raw Frame
        Ok(_) => None,
        Err(e) => Some(TransportEvent::Error(e.to_string())),
    }
}
