//! Tower service to [`Transport`] adapter.

use std::future::Future;

use tower::{Service, ServiceExt};

use crate::{Error, Request, Result, StreamingResponse, Transport};

/// A [`Transport`] backed by a tower service.
///
/// Each request runs on a clone of the service, so the service must be cheap
/// to clone (as layered [`HyperTransport`](crate::HyperTransport)s are).
#[derive(Debug, Clone)]
pub struct ServiceTransport<S> {
    inner: S,
}

impl<S> ServiceTransport<S> {
    /// Wrap a service.
    #[must_use]
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped service.
    #[must_use]
    pub const fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Transport for ServiceTransport<S>
where
    S: Service<Request, Response = StreamingResponse, Error = Error> + Clone + Send + Sync,
    S::Future: Send,
{
    fn execute(&self, request: Request) -> impl Future<Output = Result<StreamingResponse>> + Send {
        self.inner.clone().oneshot(request)
    }
}
