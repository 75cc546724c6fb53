//! Client configuration types.

use std::time::Duration;

use crate::Proxy;

/// Configuration for [`HyperTransport`](crate::HyperTransport) and
/// [`Courier`](crate::Courier).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for a whole buffered exchange: connect, headers and body.
    pub timeout: Duration,
    /// Deadline for a streamed body, counted from when streaming starts.
    pub stream_timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Reuse connections between requests.
    pub keep_alive: bool,
    /// Skip TLS certificate verification.
    pub danger_accept_invalid_certs: bool,
    /// Route connections through a proxy.
    pub proxy: Option<Proxy>,
    /// Capacity of the line channel returned by streaming calls.
    pub stream_buffer: usize,
    /// Longest accepted line in a streamed body, in bytes.
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            stream_timeout: Duration::from_secs(30 * 60),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 5,
            pool_idle_timeout: Duration::from_secs(2),
            keep_alive: true,
            danger_accept_invalid_certs: false,
            proxy: None,
            stream_buffer: 1000,
            max_line_length: 64 * 1024,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    stream_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    keep_alive: Option<bool>,
    danger_accept_invalid_certs: Option<bool>,
    proxy: Option<Proxy>,
    stream_buffer: Option<usize>,
    max_line_length: Option<usize>,
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the streamed body timeout.
    #[must_use]
    pub const fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_max_idle_per_host(mut self, count: usize) -> Self {
        self.pool_max_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Enable or disable connection reuse.
    #[must_use]
    pub const fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    /// Skip TLS certificate verification.
    ///
    /// Only for development against self-signed servers.
    #[must_use]
    pub const fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = Some(accept);
        self
    }

    /// Route connections through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set the line channel capacity for streaming calls.
    #[must_use]
    pub const fn stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = Some(capacity);
        self
    }

    /// Set the longest accepted streamed line, in bytes.
    #[must_use]
    pub const fn max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = Some(length);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            stream_timeout: self.stream_timeout.unwrap_or(defaults.stream_timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            keep_alive: self.keep_alive.unwrap_or(defaults.keep_alive),
            danger_accept_invalid_certs: self
                .danger_accept_invalid_certs
                .unwrap_or(defaults.danger_accept_invalid_certs),
            proxy: self.proxy.or(defaults.proxy),
            // A zero-capacity channel cannot be created.
            stream_buffer: self.stream_buffer.unwrap_or(defaults.stream_buffer).max(1),
            max_line_length: self.max_line_length.unwrap_or(defaults.max_line_length),
        }
    }
}
