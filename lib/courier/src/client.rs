//! The caller-facing client.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::stream::LinePump;
use crate::{
    ClientConfig, Error, HyperTransport, LineStream, Request, RequestSpec, Response, Result,
    StreamingResponse, Transport, decode, encode,
};

/// Sends [`RequestSpec`]s through a [`Transport`].
///
/// Each call encodes the request description, executes it and decodes the
/// response. Nothing is shared between calls except the transport's
/// connection pool.
///
/// # Example
///
/// ```ignore
/// use courier::{Courier, RequestSpec};
///
/// let courier = Courier::with_defaults()?;
/// let response = courier
///     .send(
///         RequestSpec::builder("https://api.example.com/users")
///             .post()
///             .json(serde_json::json!({ "name": "Alice" }))
///             .build(),
///     )
///     .await?;
/// assert!(response.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct Courier<T = HyperTransport> {
    transport: T,
    config: ClientConfig,
}

impl Courier<HyperTransport> {
    /// Create a client over a [`HyperTransport`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HyperTransport::new(&config)?;
        Ok(Self { transport, config })
    }

    /// Create a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn with_defaults() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }
}

impl<T: Transport> Courier<T> {
    /// Create a client over any transport.
    ///
    /// Only the timeout, streaming and line settings of `config` apply; the
    /// transport keeps its own connection settings.
    #[must_use]
    pub const fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request and buffer its decoded response.
    ///
    /// The whole exchange, body included, is bounded by
    /// [`ClientConfig::timeout`].
    ///
    /// # Errors
    ///
    /// Returns an error if `spec` is invalid (nothing is sent), if the
    /// exchange fails, or if the body cannot be read or gunzipped.
    pub async fn send(&self, spec: RequestSpec) -> Result<Response> {
        self.send_with_cancel(spec, &CancellationToken::new()).await
    }

    /// Like [`send`](Self::send), aborting with [`Error::Cancelled`] once
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_with_cancel(
        &self,
        spec: RequestSpec,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.exchange_with_cancel(spec, cancel)
            .await
            .map(Exchange::into_response)
    }

    /// Send a request and return the encoded request with its response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn exchange(&self, spec: RequestSpec) -> Result<Exchange> {
        self.exchange_with_cancel(spec, &CancellationToken::new())
            .await
    }

    /// Like [`exchange`](Self::exchange), aborting with
    /// [`Error::Cancelled`] once `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn exchange_with_cancel(
        &self,
        spec: RequestSpec,
        cancel: &CancellationToken,
    ) -> Result<Exchange> {
        let request = encode(spec)?;
        let span = request_span(&request);

        async {
            debug!(headers = ?request.headers(), "request encoded");
            let start = Instant::now();

            let result = guarded(cancel, self.config.timeout, async {
                let response = self.transport.execute(request.clone()).await?;
                decode(response).await
            })
            .await;

            log_outcome(result.as_ref().map(Response::status), start);
            result.map(|response| Exchange { request, response })
        }
        .instrument(span)
        .await
    }

    /// Send a request and stream the non-empty lines of its body.
    ///
    /// Returns once the response headers arrive; reaching that point is
    /// bounded by [`ClientConfig::timeout`]. The body is then read in the
    /// background for at most [`ClientConfig::stream_timeout`]. The body is
    /// not gunzipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `spec` is invalid or the exchange fails before
    /// headers arrive. Later failures are delivered on the stream.
    pub async fn send_stream(&self, spec: RequestSpec) -> Result<LineStream> {
        self.send_stream_with_cancel(spec, CancellationToken::new())
            .await
    }

    /// Like [`send_stream`](Self::send_stream); once `cancel` fires the
    /// call fails with [`Error::Cancelled`], or the stream closes if it
    /// was already returned.
    ///
    /// # Errors
    ///
    /// See [`send_stream`](Self::send_stream).
    pub async fn send_stream_with_cancel(
        &self,
        spec: RequestSpec,
        cancel: CancellationToken,
    ) -> Result<LineStream> {
        let request = encode(spec)?;
        let span = request_span(&request);

        async {
            debug!(headers = ?request.headers(), "request encoded");
            let start = Instant::now();

            let result = guarded(&cancel, self.config.timeout, self.transport.execute(request)).await;
            log_outcome(result.as_ref().map(StreamingResponse::status), start);

            let (status, headers, body) = result?.into_parts();
            let (sender, receiver) = mpsc::channel(self.config.stream_buffer.max(1));
            let pump = LinePump::new(
                status,
                self.config.max_line_length,
                sender,
                cancel,
                self.config.stream_timeout,
            );
            tokio::spawn(pump.run(body).in_current_span());

            Ok(LineStream::new(status, headers, receiver))
        }
        .instrument(span)
        .await
    }
}

/// An encoded request with its decoded response.
#[derive(Debug, Clone)]
pub struct Exchange {
    request: Request,
    response: Response,
}

impl Exchange {
    /// The request as sent, headers and body included.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// The decoded response.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.response.status()
    }

    /// Drop the request and keep the response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Split into request and response.
    #[must_use]
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}

fn request_span(request: &Request) -> tracing::Span {
    let method = request.method();
    let url = request.url().as_str();
    span!(Level::INFO, "http_request", %method, %url)
}

/// Run `fut` until it completes, `limit` elapses or `cancel` fires.
async fn guarded<F, R>(cancel: &CancellationToken, limit: Duration, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = tokio::time::timeout(limit, fut) => result.unwrap_or(Err(Error::Timeout)),
    }
}

fn log_outcome(result: std::result::Result<u16, &Error>, start: Instant) {
    // Saturating conversion to u64
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(status) if (200..300).contains(&status) => {
            info!(status, elapsed_ms, "request completed");
        }
        Ok(status) => warn!(status, elapsed_ms, "request failed with HTTP error"),
        Err(err) => warn!(error = %err, elapsed_ms, "request failed"),
    }
}
