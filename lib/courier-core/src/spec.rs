//! Declarative request descriptions.
//!
//! A [`RequestSpec`] says what to send: URL, method, headers, cookies and a
//! body with its content type. Nothing is validated until it is encoded, see
//! [`encode`](crate::encode).
//!
//! # Example
//!
//! ```
//! use courier_core::{ContentType, Method, RequestSpec};
//!
//! let spec = RequestSpec::builder("https://api.example.com/users")
//!     .post()
//!     .json(serde_json::json!({"name": "alice"}))
//!     .header("Accept", "application/json")
//!     .cookie("session", "abc")
//!     .build();
//!
//! assert_eq!(spec.method, Some(Method::Post));
//! assert_eq!(spec.content_type, Some(ContentType::Json));
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::{ContentType, FormField, Method, Params, ParamValue, Payload};

/// The `User-Agent` sent when the caller does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Headers
// ============================================================================

/// A header value: one value, or several sent as repeated headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// A single value.
    One(String),
    /// Values sent in order, one header line each.
    Many(Vec<String>),
}

impl HeaderValue {
    /// Iterate over the values.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }

    /// The first value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.iter().next()
    }

    /// Add a value after the existing ones.
    pub fn push(&mut self, value: impl Into<String>) {
        let value = value.into();
        match self {
            Self::One(first) => *self = Self::Many(vec![std::mem::take(first), value]),
            Self::Many(values) => values.push(value),
        }
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<ContentType> for HeaderValue {
    fn from(content_type: ContentType) -> Self {
        Self::One(content_type.as_str().to_string())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Request headers, keyed by exact name.
///
/// Lookups are case-sensitive: `content-type` and `Content-Type` are
/// different keys.
pub type Headers = BTreeMap<String, HeaderValue>;

// ============================================================================
// Cookies
// ============================================================================

/// A single cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
}

impl Cookie {
    /// Create a cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cookies to send with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cookies {
    /// A preformatted `Cookie` header value.
    Raw(String),
    /// Name/value pairs, sent in key order.
    Map(BTreeMap<String, String>),
    /// Cookies, sent in order.
    List(Vec<Cookie>),
}

impl Cookies {
    /// Render as a `Cookie` header value (`a=1; b=2`).
    ///
    /// `Raw` is sent verbatim. Names and values of the other forms are
    /// sanitized: bytes a cookie cannot carry are dropped and values with a
    /// space or comma are quoted.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Raw(raw) => raw.clone(),
            Self::Map(map) => map
                .iter()
                .map(|(name, value)| cookie_pair(name, value))
                .collect::<Vec<_>>()
                .join("; "),
            Self::List(cookies) => cookies
                .iter()
                .map(|c| cookie_pair(&c.name, &c.value))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    fn push(&mut self, cookie: Cookie) {
        match self {
            Self::Raw(raw) => {
                if !raw.is_empty() {
                    raw.push_str("; ");
                }
                raw.push_str(&cookie_pair(&cookie.name, &cookie.value));
            }
            Self::Map(map) => {
                map.insert(cookie.name, cookie.value);
            }
            Self::List(cookies) => cookies.push(cookie),
        }
    }
}

/// Format one `name=value` pair.
fn cookie_pair(name: &str, value: &str) -> String {
    let name: String = name.chars().filter(|&c| is_token_char(c)).collect();
    let value: String = value.chars().filter(|&c| is_cookie_value_char(c)).collect();
    if value.contains([' ', ',']) {
        format!("{name}=\"{value}\"")
    } else {
        format!("{name}={value}")
    }
}

/// RFC 7230 `tchar`.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Printable ASCII except the cookie delimiters.
fn is_cookie_value_char(c: char) -> bool {
    matches!(c, ' '..='~') && !matches!(c, '"' | ';' | '\\')
}

impl From<String> for Cookies {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for Cookies {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<BTreeMap<String, String>> for Cookies {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<Cookie>> for Cookies {
    fn from(cookies: Vec<Cookie>) -> Self {
        Self::List(cookies)
    }
}

// ============================================================================
// User agents
// ============================================================================

/// Browser `User-Agent` presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAgent {
    /// Google Chrome on Windows.
    Chrome,
    /// Mozilla Firefox on Windows.
    Firefox,
    /// Internet Explorer 9.
    InternetExplorer,
    /// Microsoft Edge on Windows.
    Edge,
    /// The WeChat embedded browser.
    WeChat,
}

impl UserAgent {
    /// The header value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            }
            Self::Firefox => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0"
            }
            Self::InternetExplorer => {
                "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.1; Trident/5.0)"
            }
            Self::Edge => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0"
            }
            Self::WeChat => {
                "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/81.0.4044.138 Safari/537.36 MicroMessenger/7.0.9.501"
            }
        }
    }
}

impl std::fmt::Display for UserAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RequestSpec
// ============================================================================

/// A declarative description of one HTTP call.
///
/// Consumed once by [`encode`](crate::encode). Build it field by field or with
/// [`RequestSpec::builder`].
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    /// Absolute URL. Query parameters may be appended for GET requests.
    pub url: String,
    /// Request method; required.
    pub method: Option<Method>,
    /// How the body is encoded; `None` means unset.
    pub content_type: Option<ContentType>,
    /// Request body.
    pub body: Option<Payload>,
    /// Headers, keyed by exact name.
    pub headers: Headers,
    /// Cookies, merged into the `Cookie` header.
    pub cookies: Option<Cookies>,
}

impl RequestSpec {
    /// Start building a spec for the given URL.
    #[must_use]
    pub fn builder(url: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder::new(url)
    }
}

/// Builder for [`RequestSpec`].
#[derive(Debug, Clone, Default)]
pub struct RequestSpecBuilder {
    spec: RequestSpec,
}

impl RequestSpecBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            spec: RequestSpec {
                url: url.into(),
                ..RequestSpec::default()
            },
        }
    }

    /// Replace the URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.spec.url = url.into();
        self
    }

    /// Set the method.
    #[must_use]
    pub const fn method(mut self, method: Method) -> Self {
        self.spec.method = Some(method);
        self
    }

    /// Use GET.
    #[must_use]
    pub const fn get(self) -> Self {
        self.method(Method::Get)
    }

    /// Use POST.
    #[must_use]
    pub const fn post(self) -> Self {
        self.method(Method::Post)
    }

    /// Set a header, replacing any value under the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.spec.headers.insert(name.into(), value.into());
        self
    }

    /// Set several headers.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        self.spec
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the `User-Agent` header to a browser preset.
    #[must_use]
    pub fn user_agent(self, agent: UserAgent) -> Self {
        self.header("User-Agent", agent.as_str())
    }

    /// Set the content type tag.
    #[must_use]
    pub const fn content_type(mut self, content_type: ContentType) -> Self {
        self.spec.content_type = Some(content_type);
        self
    }

    /// Set the body without changing the content type.
    #[must_use]
    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.spec.body = Some(body.into());
        self
    }

    /// A JSON body serialized from `value`.
    #[must_use]
    pub fn json<T>(self, value: T) -> Self
    where
        T: serde::Serialize + Send + Sync + 'static,
    {
        self.content_type(ContentType::Json)
            .body(Payload::structured(value))
    }

    /// A JSON body sent verbatim.
    #[must_use]
    pub fn json_str(self, json: impl Into<String>) -> Self {
        self.content_type(ContentType::Json)
            .body(Payload::Text(json.into()))
    }

    /// An XML body serialized from `value`.
    #[must_use]
    pub fn xml<T>(self, value: T) -> Self
    where
        T: serde::Serialize + Send + Sync + 'static,
    {
        self.content_type(ContentType::Xml)
            .body(Payload::structured(value))
    }

    /// An XML body sent verbatim.
    #[must_use]
    pub fn xml_str(self, xml: impl Into<String>) -> Self {
        self.content_type(ContentType::Xml)
            .body(Payload::Text(xml.into()))
    }

    /// A plain text body.
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.content_type(ContentType::Text)
            .body(Payload::Text(text.into()))
    }

    /// A URL-encoded body.
    #[must_use]
    pub fn urlencoded(self, params: Params) -> Self {
        self.content_type(ContentType::UrlEncoded)
            .body(Payload::Params(params))
    }

    /// Add a parameter to the body's parameter map.
    ///
    /// Starts a new map if the body is unset or not a map. Without a content
    /// type, a GET request sends the map in the query string.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        match &mut self.spec.body {
            Some(Payload::Params(params)) => {
                params.insert(key, value);
            }
            body => *body = Some(Payload::Params(Params::new().with(key, value))),
        }
        self
    }

    /// Append a multipart text field.
    #[must_use]
    pub fn form_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_field(FormField::text(name, value))
    }

    /// Append a multipart file field.
    #[must_use]
    pub fn form_file(
        self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        contents: impl Into<Bytes>,
    ) -> Self {
        self.form_field(FormField::file(name, file_name, contents))
    }

    /// Append a multipart field, switching the content type to multipart.
    #[must_use]
    pub fn form_field(mut self, field: FormField) -> Self {
        self.spec.content_type = Some(ContentType::Form);
        self.spec.body = Some(match self.spec.body.take() {
            Some(Payload::Fields(mut fields)) => {
                fields.push(field);
                Payload::Fields(fields)
            }
            Some(Payload::Field(first)) => Payload::Fields(vec![first, field]),
            _ => Payload::Fields(vec![field]),
        });
        self
    }

    /// Replace the cookies.
    #[must_use]
    pub fn cookies(mut self, cookies: impl Into<Cookies>) -> Self {
        self.spec.cookies = Some(cookies.into());
        self
    }

    /// Add one cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let cookie = Cookie::new(name, value);
        match &mut self.spec.cookies {
            Some(cookies) => cookies.push(cookie),
            None => self.spec.cookies = Some(Cookies::List(vec![cookie])),
        }
        self
    }

    /// Builds the [`RequestSpec`].
    #[must_use]
    pub fn build(self) -> RequestSpec {
        self.spec
    }
}
