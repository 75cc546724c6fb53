//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Cookie, Cookies, Error, FormField, Method, Params, Payload, Request, RequestSpec,
    Response, Result, StreamingResponse, Transport, UserAgent, decode, encode,
};
