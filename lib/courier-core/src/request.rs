//! Encoded, ready-to-send requests.
//!
//! A [`Request`] is what [`encode`](crate::encode) produces from a
//! [`RequestSpec`](crate::RequestSpec): every header injected, the body
//! serialized and the URL final.

use bytes::Bytes;

use crate::{HeaderValue, Headers, Method};

/// An HTTP request with method, URL, headers, and body bytes.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Creates a new request.
    #[must_use]
    pub fn new(method: Method, url: url::Url, headers: Headers, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// First header value by exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(HeaderValue::first)
    }

    /// Every `(name, value)` pair, repeated headers expanded in order.
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, value)| value.iter().map(move |v| (name.as_str(), v)))
    }

    /// Request body; empty when none was given.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, Headers, Bytes) {
        (self.method, self.url, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accessors() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), HeaderValue::from("application/json"));
        headers.insert("X-Tag".to_string(), HeaderValue::from(vec!["a", "b"]));

        let request = Request::new(Method::Post, url, headers, Bytes::from("{}"));

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.url().as_str(), "https://api.example.com/users");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
        assert_eq!(request.body().as_ref(), b"{}");
        assert_eq!(
            request.header_pairs().collect::<Vec<_>>(),
            vec![
                ("Accept", "application/json"),
                ("X-Tag", "a"),
                ("X-Tag", "b")
            ]
        );
    }

    #[test]
    fn request_into_parts() {
        let url = url::Url::parse("http://h/").expect("valid URL");
        let request = Request::new(Method::Get, url, Headers::new(), Bytes::new());
        let (method, url, headers, body) = request.into_parts();
        assert_eq!(method, Method::Get);
        assert_eq!(url.as_str(), "http://h/");
        assert!(headers.is_empty());
        assert!(body.is_empty());
    }
}
