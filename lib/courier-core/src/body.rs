//! Body serialization utilities.

use std::str::FromStr;

use bytes::Bytes;

use crate::{Error, Result};

/// Content type tag selecting how a request body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Multipart form data (`multipart/form-data`), text fields and file uploads.
    Form,
    /// JSON content type (`application/json`).
    Json,
    /// XML content type (`application/xml`).
    Xml,
    /// Plain text content type (`text/plain`).
    Text,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    UrlEncoded,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Form => "multipart/form-data",
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Text => "text/plain",
            Self::UrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    /// Parses a MIME type, ignoring parameters such as `charset`.
    fn from_str(s: &str) -> Result<Self> {
        let mime = s.split(';').next().unwrap_or_default().trim();
        [Self::Form, Self::Json, Self::Xml, Self::Text, Self::UrlEncoded]
            .into_iter()
            .find(|ct| ct.as_str().eq_ignore_ascii_case(mime))
            .ok_or_else(|| Error::invalid_request(format!("unsupported content type: {s}")))
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to an XML document.
///
/// The root element is named after the serialized type, so maps and
/// sequences (which have no name) are rejected.
///
/// # Errors
///
/// Returns [`Error::XmlSerialization`] if the value cannot be represented as XML.
///
/// # Example
///
/// ```
/// use courier_core::to_xml;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Note { to: String }
///
/// let note = Note { to: "Alice".to_string() };
/// assert_eq!(to_xml(&note).expect("serialize"), "<Note><to>Alice</to></Note>");
/// ```
pub fn to_xml<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    quick_xml::se::to_string(value).map_err(|e| Error::xml_serialization(e.to_string()))
}

/// Serialize a value to form URL-encoded bytes.
///
/// Accepts structs, maps, and sequences of `(key, value)` pairs.
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::to_form;
///
/// let pairs = [("username", "alice"), ("tags[]", "a b")];
/// let bytes = to_form(&pairs).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"username=alice&tags%5B%5D=a+b");
/// ```
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_urlencoded::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::json_deserialization(e.path().to_string(), e.inner().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_as_str() {
        assert_eq!(ContentType::Form.as_str(), "multipart/form-data");
        assert_eq!(ContentType::Json.as_str(), "application/json");
        assert_eq!(ContentType::Xml.as_str(), "application/xml");
        assert_eq!(ContentType::Text.as_str(), "text/plain");
        assert_eq!(
            ContentType::UrlEncoded.as_str(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn content_type_display() {
        assert_eq!(ContentType::Json.to_string(), "application/json");
    }

    #[test]
    fn content_type_from_str() {
        assert_eq!(
            "application/json; charset=utf-8"
                .parse::<ContentType>()
                .expect("json"),
            ContentType::Json
        );
        assert_eq!(
            "Text/Plain".parse::<ContentType>().expect("text"),
            ContentType::Text
        );
        assert!("image/png".parse::<ContentType>().is_err());
    }

    #[test]
    fn to_xml_rejects_unnamed_root() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("a", 1);
        let err = to_xml(&map).expect_err("maps have no root element");
        assert!(matches!(err, Error::XmlSerialization(_)));
    }

    #[test]
    fn from_json_error_path() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Outer {
            inner: Inner,
        }
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Inner {
            count: u32,
        }

        let err = from_json::<Outer>(br#"{"inner":{"count":"x"}}"#).expect_err("type mismatch");
        match err {
            Error::JsonDeserialization { path, .. } => assert_eq!(path, "inner.count"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
