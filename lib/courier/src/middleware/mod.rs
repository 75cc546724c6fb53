//! Tower middleware for courier transports.
//!
//! [`HyperTransport`](crate::HyperTransport) is a
//! `tower::Service<Request, Response = StreamingResponse>`, so any layer over
//! that signature wraps it. [`ServiceTransport`] turns the layered service
//! back into a [`Transport`](crate::Transport) that
//! [`Courier`](crate::Courier) can drive.
//!
//! # Example
//!
//! ```ignore
//! use courier::middleware::{LoggingLayer, ServiceBuilder, ServiceTransport};
//! use courier::{ClientConfig, Courier, HyperTransport};
//!
//! let config = ClientConfig::default();
//! let service = ServiceBuilder::new()
//!     .layer(LoggingLayer::debug())
//!     .service(HyperTransport::new(&config)?);
//! let courier = Courier::new(ServiceTransport::new(service), config);
//! ```

mod logging;
mod service;

pub use logging::{LogLevel, Logging, LoggingLayer};
pub use service::ServiceTransport;

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
