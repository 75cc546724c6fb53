//! HTTP transport using hyper-util.

use std::collections::HashMap;
use std::error::Error as _;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyStream, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::connect::proxy::{SocksV5, Tunnel};
use hyper_util::client::legacy::{Builder, Client};
use hyper_util::rt::TokioExecutor;
use tower_service::Service;

use crate::connector::{
    ForwardProxy, forward_dialer, http_connector, https_connector, socks_dialer, tls_config,
    tunnel_dialer,
};
use crate::{ClientConfig, Error, Proxy, Request, Result, StreamingBody, StreamingResponse, Transport};

type HyperClient<C> = Client<HttpsConnector<C>, Full<Bytes>>;

#[derive(Clone)]
enum Inner {
    Direct(HyperClient<HttpConnector>),
    Socks(HyperClient<SocksV5<HttpConnector>>),
    HttpProxy {
        forward: Client<ForwardProxy<HttpConnector>, Full<Bytes>>,
        tunnel: HyperClient<Tunnel<HttpConnector>>,
    },
}

/// [`Transport`] over a pooled hyper client with rustls.
///
/// Owns its connection pool: create one and share it (it is cheap to clone)
/// rather than building one per request.
///
/// # Example
///
/// ```ignore
/// use courier::{ClientConfig, HyperTransport, Proxy};
///
/// let transport = HyperTransport::new(
///     &ClientConfig::builder()
///         .proxy("socks5://127.0.0.1:1080".parse()?)
///         .build(),
/// )?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Inner,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.inner {
            Inner::Direct(_) => "direct",
            Inner::Socks(_) => "socks5",
            Inner::HttpProxy { .. } => "http-proxy",
        };
        f.debug_struct("HyperTransport")
            .field("mode", &mode)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Build a transport from the pool, TLS and proxy settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let tls = tls_config(config.danger_accept_invalid_certs)?;
        let builder = pool_builder(config);

        let inner = match &config.proxy {
            None => Inner::Direct(builder.build(https_connector(tls, http_connector(config)))),
            Some(Proxy::Socks5 { uri, auth }) => Inner::Socks(builder.build(https_connector(
                tls,
                socks_dialer(config, uri.clone(), auth.clone()),
            ))),
            Some(Proxy::Http { uri }) => Inner::HttpProxy {
                forward: builder.build(forward_dialer(config, uri.clone())),
                tunnel: builder.build(https_connector(tls, tunnel_dialer(config, uri.clone()))),
            },
        };

        Ok(Self { inner })
    }

    /// Build a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&ClientConfig::default())
    }

    async fn send(&self, request: Request) -> Result<StreamingResponse> {
        let plain_http = request.url().scheme() == "http";
        let hyper_request = build_hyper_request(request)?;

        let response = match &self.inner {
            Inner::Direct(client) => client.request(hyper_request).await,
            Inner::Socks(client) => client.request(hyper_request).await,
            // Only TLS targets are tunneled; plain requests go to the proxy as is.
            Inner::HttpProxy { forward, .. } if plain_http => forward.request(hyper_request).await,
            Inner::HttpProxy { tunnel, .. } => tunnel.request(hyper_request).await,
        }
        .map_err(map_hyper_error)?;

        let status = response.status().as_u16();
        let headers = extract_headers(response.headers());

        let body: StreamingBody = Box::pin(
            BodyStream::new(response.into_body())
                .map_ok(|frame| frame.into_data().unwrap_or_default())
                .map_err(|e| Error::connection(e.to_string())),
        );

        Ok(StreamingResponse::new(status, headers, body))
    }
}

fn pool_builder(config: &ClientConfig) -> Builder {
    let idle_per_host = if config.keep_alive {
        config.pool_max_idle_per_host
    } else {
        0
    };

    let mut builder = Client::builder(TokioExecutor::new());
    builder
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(idle_per_host);
    builder
}

/// Build a hyper request from an encoded request.
fn build_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
    let mut builder = http::Request::builder()
        .method(http::Method::from(request.method()))
        .uri(request.url().as_str());

    for (name, value) in request.header_pairs() {
        builder = builder.header(name, value);
    }

    let (_, _, _, body) = request.into_parts();
    builder
        .body(Full::new(body))
        .map_err(|e| Error::invalid_request(e.to_string()))
}

/// Extract response headers as a `HashMap`.
///
/// Repeated headers are joined with `, `, except `Set-Cookie` whose values
/// may contain commas: those are joined with `\n`, which no header value
/// can contain.
fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
    let mut extracted = HashMap::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let separator = if name == http::header::SET_COOKIE { "\n" } else { ", " };
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if !values.is_empty() {
            extracted.insert(name.to_string(), values.join(separator));
        }
    }
    extracted
}

#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg = format!("{msg}: {cause}");
        source = cause.source();
    }

    let lower = msg.to_ascii_lowercase();
    if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
        return Error::tls(msg);
    }

    Error::connection(msg)
}

impl Transport for HyperTransport {
    async fn execute(&self, request: Request) -> Result<StreamingResponse> {
        self.send(request).await
    }
}

impl Service<Request> for HyperTransport {
    type Response = StreamingResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await })
    }
}
