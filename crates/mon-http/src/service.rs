//! The hyper `Service` adapter around the dispatcher.
//!
//! [`MonHttpService`] collects the request body, builds the model request,
//! runs the synchronous dispatch pipeline, and maps the model response back
//! into an `http::Response`. It owns the transport-side concerns the core
//! stays out of: common response headers (`Server`, `Date`,
//! `x-request-id`), streaming file-backed bodies into memory, and the
//! keep-alive decision.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use mon_core::Dispatcher;
use mon_model::Request;
use tracing::{debug, error};
use uuid::Uuid;

use crate::body::MonResponseBody;

/// Configuration for the HTTP adapter.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// The `Server` header value.
    pub server_header: String,
    /// Whether to attach a generated `x-request-id` header.
    pub request_ids: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_header: "mon".to_owned(),
            request_ids: true,
        }
    }
}

/// A hyper service dispatching every request through the mon pipeline.
pub struct MonHttpService {
    dispatcher: Arc<Dispatcher>,
    config: Arc<HttpConfig>,
    remote_addr: Option<SocketAddr>,
}

impl MonHttpService {
    /// Create a service around a shared dispatcher.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, config: HttpConfig) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
            remote_addr: None,
        }
    }

    /// Attach the peer address for the connection this service clone serves.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

impl std::fmt::Debug for MonHttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonHttpService")
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl Clone for MonHttpService {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            config: Arc::clone(&self.config),
            remote_addr: self.remote_addr,
        }
    }
}

impl Service<http::Request<Incoming>> for MonHttpService {
    type Response = http::Response<MonResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        let config = Arc::clone(&self.config);
        let remote_addr = self.remote_addr;

        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let body = match incoming.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    error!(error = %err, "failed to collect request body");
                    Bytes::new()
                }
            };
            Ok(respond(&dispatcher, parts, body, remote_addr, &config).await)
        })
    }
}

/// Run one collected request through the pipeline and build the wire
/// response.
pub async fn respond(
    dispatcher: &Dispatcher,
    parts: http::request::Parts,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    config: &HttpConfig,
) -> http::Response<MonResponseBody> {
    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let version = parts.version;
    debug!(%method, %uri, "dispatching request");

    let keep_alive = should_keep_alive(version, connection_header(&parts.headers));
    let request = Request::from_parts(parts, body).with_remote_addr(remote_addr);
    let response = dispatcher.dispatch(request);

    if let Some(exception) = response.exception() {
        debug!(%method, %uri, exception, "response carries a bound exception");
    }

    into_wire(response, version, keep_alive, config).await
}

/// Map a model response into `http::Response`, turning any file reference
/// into a streamed body.
async fn into_wire(
    response: mon_model::Response,
    version: http::Version,
    keep_alive: bool,
    config: &HttpConfig,
) -> http::Response<MonResponseBody> {
    let status = response.status();

    let body = if let Some(path) = response.file_ref() {
        match MonResponseBody::from_file(path).await {
            Ok(body) => body,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to open response file");
                return plain_500(version, config);
            }
        }
    } else if response.body().is_empty() {
        MonResponseBody::empty()
    } else {
        MonResponseBody::from_bytes(response.body().clone())
    };

    let mut builder = http::Response::builder().status(status).version(version);
    if let Some(headers) = builder.headers_mut() {
        headers.extend(response.headers().clone());
    }
    let mut wire = builder
        .body(body)
        .unwrap_or_else(|_| http::Response::new(MonResponseBody::empty()));
    add_common_headers(wire.headers_mut(), keep_alive, config);
    wire
}

fn plain_500(version: http::Version, config: &HttpConfig) -> http::Response<MonResponseBody> {
    let mut wire = http::Response::builder()
        .status(http::StatusCode::INTERNAL_SERVER_ERROR)
        .version(version)
        .body(MonResponseBody::empty())
        .unwrap_or_else(|_| http::Response::new(MonResponseBody::empty()));
    add_common_headers(wire.headers_mut(), false, config);
    wire
}

fn add_common_headers(headers: &mut http::HeaderMap, keep_alive: bool, config: &HttpConfig) {
    if let Ok(value) = http::HeaderValue::from_str(&config.server_header) {
        headers.insert("server", value);
    }
    let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    if let Ok(value) = http::HeaderValue::from_str(&date) {
        headers.insert("date", value);
    }
    if config.request_ids {
        if let Ok(value) = http::HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert("x-request-id", value);
        }
    }
    if !keep_alive {
        headers.insert("connection", http::HeaderValue::from_static("close"));
    }
}

fn connection_header(headers: &http::HeaderMap) -> Option<&str> {
    headers.get("connection").and_then(|v| v.to_str().ok())
}

/// The keep-alive decision: HTTP/1.1 and later default to keep-alive unless
/// the client sent `Connection: close`; older protocols default to close
/// unless the client asked for keep-alive.
#[must_use]
pub fn should_keep_alive(version: http::Version, connection: Option<&str>) -> bool {
    let wants_close = connection.is_some_and(|v| v.eq_ignore_ascii_case("close"));
    let wants_keep_alive = connection.is_some_and(|v| v.eq_ignore_ascii_case("keep-alive"));
    match version {
        http::Version::HTTP_09 | http::Version::HTTP_10 => wants_keep_alive,
        _ => !wants_close,
    }
}

#[cfg(test)]
mod tests {
    use http::Version;
    use mon_core::{
        Container, CoreConfig, DefaultExceptionHandler, Handler, MiddlewareRegistry,
    };
    use mon_model::HandlerOutcome;
    use mon_router::Router;

    use super::*;

    fn dispatcher() -> Arc<Dispatcher> {
        let mut router = Router::new();
        router
            .get("/hello", Handler::closure(|_| HandlerOutcome::text("hi")))
            .expect("register");
        Arc::new(Dispatcher::new(
            router,
            Arc::new(MiddlewareRegistry::new()),
            Arc::new(Container::new()),
            Arc::new(DefaultExceptionHandler),
            CoreConfig::default(),
        ))
    }

    fn collected(uri: &str) -> (http::request::Parts, Bytes) {
        let (parts, ()) = http::Request::builder()
            .method(http::Method::GET)
            .uri(uri)
            .body(())
            .expect("valid request")
            .into_parts();
        (parts, Bytes::new())
    }

    #[test]
    fn test_should_default_keep_alive_by_version() {
        assert!(should_keep_alive(Version::HTTP_11, None));
        assert!(!should_keep_alive(Version::HTTP_11, Some("close")));
        assert!(!should_keep_alive(Version::HTTP_10, None));
        assert!(should_keep_alive(Version::HTTP_10, Some("keep-alive")));
        assert!(should_keep_alive(Version::HTTP_11, Some("Keep-Alive")));
    }

    #[tokio::test]
    async fn test_should_dispatch_and_add_common_headers() {
        let dispatcher = dispatcher();
        let (parts, body) = collected("/hello");
        let response = respond(&dispatcher, parts, body, None, &HttpConfig::default()).await;

        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("mon"),
        );
        assert!(response.headers().contains_key("date"));
        assert!(response.headers().contains_key("x-request-id"));
        assert!(!response.headers().contains_key("connection"));
    }

    #[tokio::test]
    async fn test_should_mark_connection_close_when_requested() {
        let dispatcher = dispatcher();
        let (mut parts, body) = collected("/hello");
        parts
            .headers
            .insert("connection", "close".parse().expect("valid header"));
        let response = respond(&dispatcher, parts, body, None, &HttpConfig::default()).await;
        assert_eq!(
            response
                .headers()
                .get("connection")
                .and_then(|v| v.to_str().ok()),
            Some("close"),
        );
    }

    #[tokio::test]
    async fn test_should_answer_404_for_unknown_path() {
        let dispatcher = dispatcher();
        let (parts, body) = collected("/nope");
        let response = respond(&dispatcher, parts, body, None, &HttpConfig::default()).await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_stream_file_reference_into_wire_body() {
        use mon_model::Response;

        let path = std::env::temp_dir().join(format!("mon-http-{}.txt", Uuid::new_v4()));
        tokio::fs::write(&path, b"served from disk").await.expect("write temp file");

        let mut router = Router::new();
        let file = path.clone();
        router
            .get(
                "/download",
                Handler::closure(move |_| {
                    HandlerOutcome::response(
                        Response::new(http::StatusCode::OK).with_file(file.clone()),
                    )
                }),
            )
            .expect("register");
        let dispatcher = Arc::new(Dispatcher::new(
            router,
            Arc::new(MiddlewareRegistry::new()),
            Arc::new(Container::new()),
            Arc::new(DefaultExceptionHandler),
            CoreConfig::default(),
        ));

        let (parts, body) = collected("/download");
        let response = respond(&dispatcher, parts, body, None, &HttpConfig::default()).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(&bytes[..], b"served from disk");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_should_skip_request_id_when_disabled() {
        let dispatcher = dispatcher();
        let (parts, body) = collected("/hello");
        let config = HttpConfig { request_ids: false, ..HttpConfig::default() };
        let response = respond(&dispatcher, parts, body, None, &config).await;
        assert!(!response.headers().contains_key("x-request-id"));
    }
}
