//! HTTP method types.

use std::str::FromStr;

use derive_more::Display;

use crate::Error;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method. A parameter map body is sent in the query string.
    #[display("GET")]
    Get,
    /// POST method.
    #[display("POST")]
    Post,
}

impl Method {
    /// The method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Parses a method name, ignoring ASCII case.
    ///
    /// An empty (or blank) name is [`Error::EmptyMethod`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::EmptyMethod);
        }
        if s.eq_ignore_ascii_case("GET") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Self::Post)
        } else {
            Err(Error::invalid_request(format!(
                "unsupported HTTP method: {s}"
            )))
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
        }
    }
}

impl TryFrom<http::Method> for Method {
    type Error = Error;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        match method {
            http::Method::GET => Ok(Self::Get),
            http::Method::POST => Ok(Self::Post),
            other => Err(Error::invalid_request(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}
