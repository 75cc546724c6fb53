//! Error types for courier.

use derive_more::{Display, Error, From};

use crate::{ContentType, Method};

/// Main error type for courier operations.
///
/// Variants fall into four groups:
/// - the request is malformed (`EmptyMethod`, `InvalidUrl`, `InvalidRequest`);
/// - the body does not match its content type (`UnsupportedContentType`,
///   `InvalidFormPayload`, `UnsupportedBodyType`, `InvalidMapPayload`) or fails
///   to serialize;
/// - the transport failed (`Connection`, `Tls`, `Timeout`, `Cancelled`, `InvalidProxy`);
/// - the exchange succeeded but the response could not be decoded (`Gzip`,
///   `ReadBody`, `LineTooLong`). These carry the status code, see [`Error::status`].
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The request has no method.
    #[display("request method is empty")]
    #[from(skip)]
    EmptyMethod,

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// A body was given without a content type on a method that cannot carry
    /// it in the query string.
    #[display("no content type set for a {method} request with a body")]
    #[from(skip)]
    UnsupportedContentType {
        /// The request method.
        method: Method,
    },

    /// The multipart body is not a form field or a list of form fields.
    #[display("invalid multipart form payload: {_0}")]
    #[from(skip)]
    InvalidFormPayload(#[error(not(source))] String),

    /// The body shape cannot be encoded with the declared content type.
    #[display("unsupported body type for {content_type}")]
    #[from(skip)]
    UnsupportedBodyType {
        /// The declared content type.
        content_type: ContentType,
    },

    /// The body must be a parameter map.
    #[display("payload must be a parameter map")]
    #[from(skip)]
    InvalidMapPayload,

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// XML serialization error.
    #[display("XML serialization error: {_0}")]
    #[from(skip)]
    XmlSerialization(#[error(not(source))] String),

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_urlencoded::ser::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Invalid proxy address.
    #[display("invalid proxy: {_0}")]
    #[from(skip)]
    InvalidProxy(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The caller cancelled the request.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// The response declared gzip encoding but the body is not a valid gzip stream.
    #[display("gzip decoding failed (status {status}): {message}")]
    #[from(skip)]
    Gzip {
        /// HTTP status code of the exchange.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The response body could not be read to completion.
    #[display("failed to read response body (status {status}): {message}")]
    #[from(skip)]
    ReadBody {
        /// HTTP status code of the exchange.
        status: u16,
        /// Error message.
        message: String,
    },

    /// A streamed line exceeded the configured maximum length.
    #[display("line longer than {limit} bytes (status {status})")]
    #[from(skip)]
    LineTooLong {
        /// HTTP status code of the exchange.
        status: u16,
        /// Maximum line length in bytes.
        limit: usize,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid proxy error.
    #[must_use]
    pub fn invalid_proxy(message: impl Into<String>) -> Self {
        Self::InvalidProxy(message.into())
    }

    /// Create an XML serialization error.
    #[must_use]
    pub fn xml_serialization(message: impl Into<String>) -> Self {
        Self::XmlSerialization(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a gzip decoding error.
    #[must_use]
    pub fn gzip(status: u16, message: impl Into<String>) -> Self {
        Self::Gzip {
            status,
            message: message.into(),
        }
    }

    /// Create a body read error.
    #[must_use]
    pub fn read_body(status: u16, message: impl Into<String>) -> Self {
        Self::ReadBody {
            status,
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the caller cancelled the request.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the request was rejected before any network activity.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyMethod
                | Self::InvalidUrl(_)
                | Self::InvalidRequest(_)
                | Self::UnsupportedContentType { .. }
                | Self::InvalidFormPayload(_)
                | Self::UnsupportedBodyType { .. }
                | Self::InvalidMapPayload
                | Self::JsonSerialization(_)
                | Self::XmlSerialization(_)
                | Self::FormSerialization(_)
        )
    }

    /// Returns the HTTP status code when the exchange completed but the
    /// response could not be decoded.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Gzip { status, .. }
            | Self::ReadBody { status, .. }
            | Self::LineTooLong { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(Error::EmptyMethod.to_string(), "request method is empty");
        assert_eq!(Error::Timeout.to_string(), "request timeout");
        assert_eq!(Error::Cancelled.to_string(), "request cancelled");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::UnsupportedContentType {
            method: Method::Post,
        };
        assert_eq!(
            err.to_string(),
            "no content type set for a POST request with a body"
        );

        let err = Error::UnsupportedBodyType {
            content_type: ContentType::Text,
        };
        assert_eq!(err.to_string(), "unsupported body type for text/plain");

        let err = Error::gzip(200, "invalid gzip header");
        assert_eq!(
            err.to_string(),
            "gzip decoding failed (status 200): invalid gzip header"
        );
    }

    #[test]
    fn error_status() {
        assert_eq!(Error::gzip(200, "bad").status(), Some(200));
        assert_eq!(Error::read_body(502, "reset").status(), Some(502));
        assert_eq!(
            Error::LineTooLong {
                status: 200,
                limit: 16
            }
            .status(),
            Some(200)
        );
        assert_eq!(Error::Timeout.status(), None);
        assert_eq!(Error::EmptyMethod.status(), None);
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Cancelled.is_timeout());
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::connection("refused").is_connection());
        assert!(!Error::Timeout.is_connection());
    }

    #[test]
    fn request_errors_are_flagged() {
        assert!(Error::EmptyMethod.is_request_error());
        assert!(Error::InvalidMapPayload.is_request_error());
        assert!(Error::xml_serialization("no root").is_request_error());
        assert!(!Error::Timeout.is_request_error());
        assert!(!Error::gzip(200, "bad").is_request_error());
    }

    #[test]
    fn url_parse_error_converts() {
        let err: Error = url::Url::parse("not a url").expect_err("invalid").into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
