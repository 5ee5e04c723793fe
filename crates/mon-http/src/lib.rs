//! hyper transport adapter for the mon dispatch pipeline.
//!
//! The core pipeline is synchronous and works on buffered requests; this
//! crate is the boundary between it and hyper: body collection, model
//! request construction, wire response mapping, common headers, and the
//! keep-alive decision.

pub mod body;
pub mod service;

pub use body::MonResponseBody;
pub use service::{HttpConfig, MonHttpService, respond, should_keep_alive};
