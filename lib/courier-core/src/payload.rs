//! Request payloads.
//!
//! A [`Payload`] is one of a closed set of body shapes. Which shapes are
//! accepted depends on the request's [`ContentType`](crate::ContentType):
//!
//! | Content type | Accepted payloads |
//! |--------------|-------------------|
//! | JSON | [`Payload::Text`] (sent verbatim), [`Payload::Structured`], [`Payload::Params`] |
//! | XML | [`Payload::Text`] (sent verbatim), [`Payload::Structured`] |
//! | multipart form | [`Payload::Field`], [`Payload::Fields`] |
//! | plain text | [`Payload::Text`] |
//! | URL-encoded | [`Payload::Params`] |
//! | none, GET | [`Payload::Params`] (appended to the query string) |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::ser::SerializeSeq;

use crate::{FormField, Result};

// ============================================================================
// Structured values
// ============================================================================

/// A value serialized when the request is encoded.
///
/// Implemented for every `serde::Serialize` type; stored type-erased in
/// [`Payload::Structured`].
pub trait Structured: Send + Sync {
    /// Serialize to JSON bytes.
    fn to_json(&self) -> Result<Bytes>;

    /// Serialize to an XML document.
    fn to_xml(&self) -> Result<String>;
}

impl<T> Structured for T
where
    T: serde::Serialize + Send + Sync,
{
    fn to_json(&self) -> Result<Bytes> {
        crate::to_json(self)
    }

    fn to_xml(&self) -> Result<String> {
        crate::to_xml(self)
    }
}

// ============================================================================
// Parameter maps
// ============================================================================

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A string value.
    Text(String),
    /// Repeated values, encoded as `key[]=v` once per element.
    List(Vec<String>),
    /// An integer, formatted in decimal.
    Int(i64),
    /// A float, formatted with the shortest representation that round-trips.
    Float(f64),
    /// A single-precision float, formatted at 32-bit precision.
    Float32(f32),
}

impl ParamValue {
    /// Expand this value into `(key, value)` pairs.
    fn pairs(&self, key: &str) -> Vec<(String, String)> {
        match self {
            Self::Text(value) => vec![(key.to_string(), value.clone())],
            Self::List(values) => {
                let key = format!("{key}[]");
                values.iter().map(|v| (key.clone(), v.clone())).collect()
            }
            Self::Int(value) => vec![(key.to_string(), value.to_string())],
            Self::Float(value) => vec![(key.to_string(), value.to_string())],
            Self::Float32(value) => vec![(key.to_string(), value.to_string())],
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float32(value)
    }
}

impl serde::Serialize for ParamValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Text(value) => serializer.serialize_str(value),
            Self::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Float32(value) => serializer.serialize_f32(*value),
        }
    }
}

/// A map of named parameters, kept in key order.
///
/// Used for URL-encoded bodies and for GET query strings. Iteration, and so
/// the wire order, is lexicographic by key.
///
/// # Example
///
/// ```
/// use courier_core::Params;
///
/// let params = Params::new()
///     .with("q", "rust")
///     .with("page", 2)
///     .with("tags", vec!["a", "b"]);
///
/// assert_eq!(
///     params.to_pairs(),
///     vec![
///         ("page".to_string(), "2".to_string()),
///         ("q".to_string(), "rust".to_string()),
///         ("tags[]".to_string(), "a".to_string()),
///         ("tags[]".to_string(), "b".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Create an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a parameter, returning the previous value under the same key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Get a parameter by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flatten into `(key, value)` string pairs in wire order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .flat_map(|(key, value)| value.pairs(key))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Payload
// ============================================================================

/// A request body, one variant per body shape.
#[derive(Clone)]
pub enum Payload {
    /// A string. Sent verbatim for JSON, XML and plain text.
    Text(String),
    /// A parameter map.
    Params(Params),
    /// A single multipart form field.
    Field(FormField),
    /// Multipart form fields, sent in order.
    Fields(Vec<FormField>),
    /// A value serialized at encode time.
    Structured(Arc<dyn Structured>),
}

impl Payload {
    /// Wrap a serializable value.
    #[must_use]
    pub fn structured<T>(value: T) -> Self
    where
        T: serde::Serialize + Send + Sync + 'static,
    {
        Self::Structured(Arc::new(value))
    }

    /// A short name for the payload shape, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Params(_) => "params",
            Self::Field(_) => "form field",
            Self::Fields(_) => "form fields",
            Self::Structured(_) => "structured value",
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Params(params) => f.debug_tuple("Params").field(params).finish(),
            Self::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::Structured(_) => f.write_str("Structured(..)"),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Params> for Payload {
    fn from(params: Params) -> Self {
        Self::Params(params)
    }
}

impl From<FormField> for Payload {
    fn from(field: FormField) -> Self {
        Self::Field(field)
    }
}

impl From<Vec<FormField>> for Payload {
    fn from(fields: Vec<FormField>) -> Self {
        Self::Fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn param_value_formatting() {
        assert_eq!(ParamValue::from(42).pairs("n"), vec![pair("n", "42")]);
        assert_eq!(ParamValue::from(-7_i64).pairs("n"), vec![pair("n", "-7")]);
        assert_eq!(ParamValue::from(1.5_f64).pairs("x"), vec![pair("x", "1.5")]);
        assert_eq!(ParamValue::from(0.1_f32).pairs("x"), vec![pair("x", "0.1")]);
        assert_eq!(ParamValue::from(3.0_f64).pairs("x"), vec![pair("x", "3")]);
    }

    #[test]
    fn list_values_repeat_bracketed_key_in_order() {
        let pairs = ParamValue::from(vec!["z", "a", "m"]).pairs("tags");
        assert_eq!(
            pairs,
            vec![pair("tags[]", "z"), pair("tags[]", "a"), pair("tags[]", "m")]
        );
    }

    #[test]
    fn params_are_key_ordered() {
        let params: Params = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(params.len(), 3);
        assert!(!params.is_empty());
    }

    #[test]
    fn params_serialize_as_json_object() {
        let params = Params::new()
            .with("name", "alice")
            .with("age", 30)
            .with("tags", vec!["x", "y"]);
        let json = serde_json::to_value(&params).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"age": 30, "name": "alice", "tags": ["x", "y"]})
        );
    }

    #[test]
    fn structured_payload_serializes_lazily() {
        #[derive(serde::Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        let payload = Payload::structured(Point { x: 1, y: 2 });
        let Payload::Structured(value) = payload else {
            panic!("expected structured payload");
        };
        assert_eq!(value.to_json().expect("json").as_ref(), br#"{"x":1,"y":2}"#);
        assert_eq!(value.to_xml().expect("xml"), "<Point><x>1</x><y>2</y></Point>");
    }

    #[test]
    fn payload_debug_hides_structured_value() {
        let payload = Payload::structured(serde_json::json!({"secret": true}));
        assert_eq!(format!("{payload:?}"), "Structured(..)");
        assert_eq!(payload.kind(), "structured value");
    }
}
