//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    CancellationToken, ClientConfig, ContentType, Cookie, Cookies, Courier, Error, Exchange,
    FormField, HyperTransport, LineStream, Method, Params, Payload, Proxy, RequestSpec, Response,
    Result, StatusCode, Transport, UserAgent,
};
pub use serde::{Deserialize, Serialize};
