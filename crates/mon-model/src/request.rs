//! The per-request model object handed through the dispatch pipeline.
//!
//! A [`Request`] wraps the transport-layer data (method, URI, headers, body)
//! and is enriched during dispatch: the dispatcher attaches the route
//! variables extracted by the route table and the resolved controller/action
//! names. The request is created per inbound message and dropped after the
//! response is sent; no request state lives in process-wide slots.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;

/// One inbound HTTP request as seen by the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    params: HashMap<String, String>,
    controller: Option<String>,
    action: Option<String>,
}

impl Request {
    /// Create a request from its transport parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            version,
            headers,
            body,
            remote_addr: None,
            params: HashMap::new(),
            controller: None,
            action: None,
        }
    }

    /// Create a request from collected `http` request parts and a buffered body.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self::new(parts.method, parts.uri, parts.version, parts.headers, body)
    }

    /// Attach the peer address reported by the transport.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The decoded request path (no query string).
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, empty if absent.
    #[must_use]
    pub fn query_string(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// The HTTP protocol version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The peer address, when the transport provided one.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Parse the query string into decoded key/value pairs.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.query_string().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Look up a single query parameter by name.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        form_urlencoded::parse(self.query_string().as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Whether the client asked for a JSON answer (`Accept` header or
    /// `X-Requested-With: XMLHttpRequest`).
    #[must_use]
    pub fn expects_json(&self) -> bool {
        self.header("accept")
            .is_some_and(|a| a.contains(mime::APPLICATION_JSON.essence_str()))
            || self
                .header("x-requested-with")
                .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// The route variables extracted from the matched path pattern.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// A single route variable by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Attach the route variables for the matched route. Called by the
    /// dispatcher before the composed callable runs.
    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// The resolved controller name, if the matched handler is a
    /// controller/action pair.
    #[must_use]
    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    /// The resolved action name, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Attach the resolved controller/action names. Called by the dispatcher.
    pub fn set_controller_action(&mut self, controller: Option<String>, action: Option<String>) {
        self.controller = controller;
        self.action = action;
    }
}
