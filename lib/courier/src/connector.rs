//! HTTPS connectors using rustls.
//!
//! Every connector dials TCP through a [`HttpConnector`], optionally wrapped
//! in a SOCKS5 or HTTP `CONNECT` proxy dialer, then layers TLS on top for
//! `https://` targets. Plain `http://` targets behind an HTTP proxy go through
//! [`ForwardProxy`] instead: the request is sent to the proxy in absolute
//! form.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::proxy::{SocksV5, Tunnel};
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use rustls::RootCertStore;
use tower_service::Service;

use crate::{ClientConfig, Error, Result};

/// Build the rustls client configuration.
///
/// Verifies servers against the Mozilla root certificates unless
/// `danger_accept_invalid_certs` is set.
///
/// # Errors
///
/// Returns [`Error::Tls`] if the crypto provider rejects the default
/// protocol versions.
pub fn tls_config(danger_accept_invalid_certs: bool) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::tls(e.to_string()))?;

    if danger_accept_invalid_certs {
        return Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertVerifier))
            .with_no_client_auth());
    }

    let root_store: RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    Ok(builder
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

/// The TCP dialer shared by every connector.
#[must_use]
pub fn http_connector(config: &ClientConfig) -> HttpConnector {
    let mut connector = HttpConnector::new();
    // Proxy dialers hand it non-http URIs.
    connector.enforce_http(false);
    connector.set_connect_timeout(Some(config.connect_timeout));
    connector.set_nodelay(true);
    connector
}

/// Layer TLS over a dialer.
#[must_use]
pub fn https_connector<C>(tls: rustls::ClientConfig, dialer: C) -> HttpsConnector<C> {
    HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(dialer)
}

/// A dialer that reaches targets through a SOCKS5 proxy.
#[must_use]
pub fn socks_dialer(
    config: &ClientConfig,
    uri: http::Uri,
    auth: Option<(String, String)>,
) -> SocksV5<HttpConnector> {
    let dialer = SocksV5::new(uri, http_connector(config));
    match auth {
        Some((user, password)) => dialer.with_auth(user, password),
        None => dialer,
    }
}

/// A dialer that reaches `https://` targets through an HTTP `CONNECT` tunnel.
#[must_use]
pub fn tunnel_dialer(config: &ClientConfig, uri: http::Uri) -> Tunnel<HttpConnector> {
    Tunnel::new(uri, http_connector(config))
}

/// A dialer that connects every `http://` target to the HTTP proxy itself.
#[must_use]
pub fn forward_dialer(config: &ClientConfig, uri: http::Uri) -> ForwardProxy<HttpConnector> {
    ForwardProxy {
        proxy: uri,
        inner: http_connector(config),
    }
}

// ============================================================================
// Forward proxying
// ============================================================================

/// Connects to the proxy whatever the target, and marks the connection as
/// proxied so requests keep their absolute-form URI.
#[derive(Debug, Clone)]
pub struct ForwardProxy<C> {
    proxy: Uri,
    inner: C,
}

impl<C> Service<Uri> for ForwardProxy<C>
where
    C: Service<Uri>,
    C::Future: Send + 'static,
{
    type Response = Proxied<C::Response>;
    type Error = C::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, _target: Uri) -> Self::Future {
        let connecting = self.inner.call(self.proxy.clone());
        Box::pin(async move { connecting.await.map(Proxied) })
    }
}

/// A connection to a forward proxy.
#[derive(Debug)]
pub struct Proxied<T>(T);

impl<T: Connection> Connection for Proxied<T> {
    fn connected(&self) -> Connected {
        self.0.connected().proxy(true)
    }
}

impl<T: Read + Unpin> Read for Proxied<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

impl<T: Write + Unpin> Write for Proxied<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.0.is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write_vectored(cx, bufs)
    }
}

// ============================================================================
// Certificate verification bypass
// ============================================================================

/// Accepts any server certificate.
///
/// Installed only when `danger_accept_invalid_certs` is set; connections are
/// then open to man-in-the-middle attacks.
#[derive(Debug)]
struct AcceptAnyCertVerifier;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertVerifier {
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
