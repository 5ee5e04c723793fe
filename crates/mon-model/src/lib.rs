//! Request/response model for the mon dispatch pipeline.
//!
//! This crate defines the types that flow through the dispatcher:
//!
//! - [`Request`]: one inbound HTTP message, carrying transport data plus the
//!   route variables and controller/action names attached during dispatch.
//! - [`Response`]: the single wire-ready answer produced for every request,
//!   with JSON, XML, and redirect constructors.
//! - [`Reply`] / [`HandlerOutcome`]: what application handlers return. A
//!   short-circuit (redirect/abort/structured result) is an explicit
//!   [`HandlerOutcome::Jump`] variant carrying a pre-built response, not an
//!   error and not an unwinding control path.

pub mod outcome;
pub mod request;
pub mod response;
pub mod xml;

pub use outcome::{HandlerOutcome, Reply};
pub use request::Request;
pub use response::Response;
pub use xml::{XmlError, to_xml};
