//! Proxy addresses.

use std::fmt;
use std::str::FromStr;

use http::Uri;

use crate::{Error, Result};

const DEFAULT_SOCKS_PORT: u16 = 1080;

/// An upstream proxy.
///
/// Parsed from a URL:
/// - `socks5://host:port` or `socks5h://host:port`, optionally with
///   `user:password@` credentials;
/// - `http://host:port` or `https://host:port`, reached with `CONNECT`;
/// - a bare `host:port`, taken as SOCKS5.
///
/// # Example
///
/// ```
/// use courier::Proxy;
///
/// let proxy: Proxy = "127.0.0.1:1080".parse().expect("valid proxy");
/// assert!(matches!(proxy, Proxy::Socks5 { .. }));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum Proxy {
    /// An HTTP proxy; every connection is tunneled with `CONNECT`.
    Http {
        /// Proxy address.
        uri: Uri,
    },
    /// A SOCKS5 proxy.
    Socks5 {
        /// Proxy address.
        uri: Uri,
        /// Username and password, if the proxy requires them.
        auth: Option<(String, String)>,
    },
}

impl Proxy {
    /// The proxy address, without credentials.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        match self {
            Self::Http { uri } | Self::Socks5 { uri, .. } => uri,
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { uri } => f.debug_struct("Http").field("uri", uri).finish(),
            Self::Socks5 { uri, auth } => f
                .debug_struct("Socks5")
                .field("uri", uri)
                .field("auth", &auth.as_ref().map(|(user, _)| (user, "***")))
                .finish(),
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

impl FromStr for Proxy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let url = if s.contains("://") {
            url::Url::parse(s)
        } else {
            url::Url::parse(&format!("socks5://{s}"))
        }
        .map_err(|e| Error::invalid_proxy(format!("{s}: {e}")))?;

        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_proxy(format!("{s}: missing host")))?;

        match url.scheme() {
            "socks5" | "socks5h" => {
                let port = url.port().unwrap_or(DEFAULT_SOCKS_PORT);
                let uri = build_uri("socks5", host, port)?;
                let auth = (!url.username().is_empty()).then(|| {
                    (
                        url.username().to_string(),
                        url.password().unwrap_or_default().to_string(),
                    )
                });
                Ok(Self::Socks5 { uri, auth })
            }
            scheme @ ("http" | "https") => {
                let port = url
                    .port_or_known_default()
                    .ok_or_else(|| Error::invalid_proxy(format!("{s}: missing port")))?;
                if !url.username().is_empty() {
                    return Err(Error::invalid_proxy(format!(
                        "{s}: credentials are only supported for SOCKS5 proxies"
                    )));
                }
                Ok(Self::Http {
                    uri: build_uri(scheme, host, port)?,
                })
            }
            other => Err(Error::invalid_proxy(format!(
                "{s}: unsupported scheme `{other}`"
            ))),
        }
    }
}

fn build_uri(scheme: &str, host: &str, port: u16) -> Result<Uri> {
    format!("{scheme}://{host}:{port}")
        .parse()
        .map_err(|e: http::uri::InvalidUri| Error::invalid_proxy(e.to_string()))
}
