//! The wire-ready response produced for every dispatched request.
//!
//! Exactly one [`Response`] is produced per request. Handlers may build one
//! directly, or return structured data that the response assembler
//! normalizes. The optional bound exception carries the error display form
//! for downstream diagnostics; it never reaches the wire.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

use crate::xml;

/// An HTTP response: status, headers, body, and optionally a file reference
/// for the transport layer to stream instead of the buffered body.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    file: Option<PathBuf>,
    exception: Option<String>,
}

impl Response {
    /// Create an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// A 200 response with an HTML body.
    #[must_use]
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(body)
    }

    /// A 200 response with a plain-text body.
    #[must_use]
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body)
    }

    /// A 200 JSON response from an already-built `serde_json::Value`.
    ///
    /// Serialization of a `Value` cannot fail, so this is infallible.
    #[must_use]
    pub fn json_value(value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).expect("serializing a Value cannot fail");
        Self::new(StatusCode::OK)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// A 200 JSON response from any serializable value.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(StatusCode::OK)
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    /// A 200 XML response wrapping the value in a `<mon>` root element.
    pub fn xml(value: &serde_json::Value) -> Result<Self, xml::XmlError> {
        let body = xml::to_xml("mon", value)?;
        Ok(Self::new(StatusCode::OK)
            .with_header("content-type", "text/xml; charset=utf-8")
            .with_body(body))
    }

    /// A 302 redirect to the given location.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::new(StatusCode::FOUND).with_header("location", location)
    }

    /// Replace the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add or replace a header. Invalid names or values are dropped with a
    /// warning rather than failing the response.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            name.parse::<http::header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(name, value, "dropping invalid response header"),
        }
        self
    }

    /// Replace the body bytes.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Reference a file for the transport layer to stream as the body.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// The response status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the headers (used by the transport adapter).
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A single header value as a string, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The buffered body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The file reference, when the body should be streamed from disk.
    #[must_use]
    pub fn file_ref(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Bind the originating error's display form onto the response for
    /// diagnostics. Never sent to the client.
    pub fn bind_exception(&mut self, message: String) {
        self.exception = Some(message);
    }

    /// The bound exception, if this response was produced by error translation.
    #[must_use]
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_json_response() {
        let resp = Response::json_value(&serde_json::json!({"code": 200}));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.body().as_ref(), br#"{"code":200}"#);
    }

    #[test]
    fn test_should_build_json_from_serializable() {
        #[derive(Serialize)]
        struct Payload {
            id: u64,
        }
        let resp = Response::json(&Payload { id: 7 }).expect("serializable");
        assert_eq!(resp.body().as_ref(), br#"{"id":7}"#);
    }

    #[test]
    fn test_should_build_redirect() {
        let resp = Response::redirect("/login");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.header("location"), Some("/login"));
    }

    #[test]
    fn test_should_wrap_xml_in_mon_root() {
        let resp = Response::xml(&serde_json::json!({"code": 0})).expect("valid xml");
        let body = std::str::from_utf8(resp.body()).expect("utf-8");
        assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(body.contains("<mon>"));
        assert!(body.contains("<code>0</code>"));
        assert!(body.contains("</mon>"));
    }

    #[test]
    fn test_should_drop_invalid_header() {
        let resp = Response::new(StatusCode::OK).with_header("bad name", "x");
        assert!(resp.headers().is_empty());
    }

    #[test]
    fn test_should_bind_exception_for_diagnostics() {
        let mut resp = Response::new(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.exception().is_none());
        resp.bind_exception("boom".to_owned());
        assert_eq!(resp.exception(), Some("boom"));
    }

    #[test]
    fn test_should_keep_file_reference() {
        let resp = Response::new(StatusCode::OK).with_file("/var/www/index.html");
        assert_eq!(
            resp.file_ref(),
            Some(Path::new("/var/www/index.html")),
        );
    }
}
