//! Core types for the courier HTTP request helper.
//!
//! This crate turns declarative request descriptions into wire-ready requests
//! and decodes responses, without doing any I/O itself:
//! - [`RequestSpec`] and [`RequestSpecBuilder`] - what to send
//! - [`Payload`], [`Params`] and [`FormField`] - request bodies
//! - [`encode`] - spec to [`Request`], with content-type-specific body encoding
//! - [`decode`] - [`StreamingResponse`] to [`Response`], with gzip support
//! - [`LineSplitter`] - incremental line splitting for streamed bodies
//! - [`Transport`] - the trait a network client implements
//! - [`Error`] and [`Result`] - Error handling

mod body;
mod decode;
mod encode;
mod error;
mod method;
mod multipart;
mod payload;
pub mod prelude;
mod request;
mod response;
mod spec;
mod transport;

pub use body::{ContentType, from_json, to_form, to_json, to_xml};
pub use decode::{LineSplitter, body_error, collect_body, decode};
pub use encode::encode;
pub use error::{Error, Result};
pub use method::Method;
pub use multipart::{FieldKind, Form, FormField, Part};
pub use payload::{ParamValue, Params, Payload, Structured};
pub use request::Request;
pub use response::{Response, StreamingBody, StreamingResponse};
pub use spec::{
    Cookie, Cookies, DEFAULT_USER_AGENT, HeaderValue, Headers, RequestSpec, RequestSpecBuilder,
    UserAgent,
};
pub use transport::Transport;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
