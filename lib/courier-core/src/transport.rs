//! The network seam.
//!
//! A [`Transport`] performs one HTTP exchange for an encoded [`Request`] and
//! hands back the response with its body still streaming. Implement it to
//! plug in a different HTTP stack, or a mock in tests.

use std::future::Future;
use std::sync::Arc;

use crate::{Request, Result, StreamingResponse};

/// Executes encoded requests.
///
/// Implementations own their connection pool; they must not gunzip or
/// otherwise transform the body.
pub trait Transport: Send + Sync {
    /// Send the request and return once response headers are available.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails:
    /// - connection or DNS errors ([`Error::Connection`](crate::Error::Connection))
    /// - TLS errors ([`Error::Tls`](crate::Error::Tls))
    /// - timeouts ([`Error::Timeout`](crate::Error::Timeout))
    fn execute(&self, request: Request) -> impl Future<Output = Result<StreamingResponse>> + Send;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: Request) -> impl Future<Output = Result<StreamingResponse>> + Send {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: Request) -> impl Future<Output = Result<StreamingResponse>> + Send {
        (**self).execute(request)
    }
}
