//! An HTTP request-building helper.
//!
//! Describe a call as a [`RequestSpec`] (URL, method, headers, cookies and a
//! body with content-type-specific encoding), then let [`Courier`] encode it,
//! execute it and decode the response, gunzipping transparently.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! let courier = Courier::with_defaults()?;
//!
//! let response = courier
//!     .send(
//!         RequestSpec::builder("https://api.example.com/search")
//!             .get()
//!             .param("q", "rust")
//!             .param("page", 2)
//!             .build(),
//!     )
//!     .await?;
//! println!("{} {}", response.status(), response.text()?);
//!
//! let mut lines = courier
//!     .send_stream(RequestSpec::builder("https://api.example.com/events").get().build())
//!     .await?;
//! while let Some(line) = lines.next_line().await {
//!     println!("{}", String::from_utf8_lossy(&line?));
//! }
//! ```
//!
//! Connections go through a [`HyperTransport`]: a pooled hyper client with
//! rustls, optionally behind a SOCKS5 or HTTP [`Proxy`]. Any other
//! [`Transport`] can be plugged in with [`Courier::new`], including tower
//! stacks through [`middleware::ServiceTransport`].

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod proxy;
mod stream;
mod transport;

pub use client::{Courier, Exchange};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use proxy::Proxy;
pub use stream::LineStream;
pub use transport::HyperTransport;

// Re-export tower for middleware composition
pub use tower;

// Re-export the cancellation handle taken by `*_with_cancel` calls
pub use tokio_util::sync::CancellationToken;

// Re-export core types
pub use courier_core::{
    ContentType, Cookie, Cookies, DEFAULT_USER_AGENT, Error, FieldKind, Form, FormField,
    HeaderValue, Headers, LineSplitter, Method, ParamValue, Params, Part, Payload, Request,
    RequestSpec, RequestSpecBuilder, Response, Result, StreamingBody, StreamingResponse,
    Structured, Transport, UserAgent, body_error, collect_body, decode, encode, from_json,
    to_form, to_json, to_xml,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};
