//! Error-to-response translation.
//!
//! Routing errors translate directly to their status without being
//! reported. Everything else goes through the pluggable handler contract:
//! `report` for side effects (logging), then `render` for the client-facing
//! response. A panicking handler falls through to a hardcoded 500 that
//! cannot itself fail, so no error ever escapes the dispatch boundary.

use std::panic::{AssertUnwindSafe, catch_unwind};

use http::{Method, StatusCode};
use mon_model::{Request, Response};
use tracing::{error, warn};

use crate::error::CoreError;

/// The two-method exception handler contract.
pub trait ExceptionHandler: Send + Sync {
    /// Side-effecting reporting (logging, telemetry). Failures here never
    /// reach the client path.
    fn report(&self, error: &CoreError, request: &Request);

    /// Produce the client-facing response for an error.
    fn render(&self, error: &CoreError, request: &Request, debug: bool) -> Response;
}

/// Logs through `tracing` and renders JSON or HTML depending on what the
/// client asked for.
#[derive(Debug, Default)]
pub struct DefaultExceptionHandler;

impl ExceptionHandler for DefaultExceptionHandler {
    fn report(&self, error: &CoreError, request: &Request) {
        error!(
            error = %error,
            method = %request.method(),
            path = request.path(),
            "request failed",
        );
    }

    fn render(&self, error: &CoreError, request: &Request, debug: bool) -> Response {
        let status = error.status_code();
        let message = if debug {
            error.to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_owned()
        };
        if request.expects_json() {
            Response::json_value(&serde_json::json!({
                "code": status.as_u16(),
                "message": message,
            }))
            .with_status(status)
        } else {
            Response::html(format!(
                "<html><body><h1>{} {}</h1><p>{}</p></body></html>",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                message,
            ))
            .with_status(status)
        }
    }
}

/// Translate an error into the response to send.
///
/// Tier 1 (short-circuit jumps) never reaches here: jumps travel as
/// `Flow::Jump` values, not errors. Tier 2 handles routing errors without
/// reporting; tier 3 is the pluggable handler; tier 4 the hardcoded
/// fallback when the handler itself panics.
pub fn translate(
    error: &CoreError,
    request: &Request,
    handler: &dyn ExceptionHandler,
    debug: bool,
) -> Response {
    if error.is_routing() {
        return routing_response(error);
    }

    if catch_unwind(AssertUnwindSafe(|| handler.report(error, request))).is_err() {
        warn!("exception handler panicked during report");
    }

    match catch_unwind(AssertUnwindSafe(|| handler.render(error, request, debug))) {
        Ok(mut response) => {
            response.bind_exception(error.to_string());
            response
        }
        Err(_) => {
            warn!("exception handler panicked during render, using fallback");
            fallback_response(error, debug)
        }
    }
}

fn routing_response(error: &CoreError) -> Response {
    let mut response = Response::new(error.status_code())
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body(error.to_string());
    if let CoreError::MethodNotAllowed { allowed } = error {
        let list = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        response = response.with_header("allow", &list);
    }
    response
}

fn fallback_response(error: &CoreError, debug: bool) -> Response {
    let body = if debug {
        error.to_string()
    } else {
        "Internal Server Error".to_owned()
    };
    let mut response = Response::new(StatusCode::INTERNAL_SERVER_ERROR)
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body(body);
    response.bind_exception(error.to_string());
    response
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, Uri, Version};

    use super::*;

    fn request() -> Request {
        Request::new(
            Method::GET,
            Uri::from_static("/widgets"),
            Version::HTTP_11,
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    struct CountingHandler {
        reports: std::sync::atomic::AtomicUsize,
    }

    impl ExceptionHandler for CountingHandler {
        fn report(&self, _error: &CoreError, _request: &Request) {
            self.reports.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn render(&self, error: &CoreError, _request: &Request, _debug: bool) -> Response {
            Response::new(error.status_code()).with_body("rendered")
        }
    }

    struct BrokenHandler;

    impl ExceptionHandler for BrokenHandler {
        fn report(&self, _error: &CoreError, _request: &Request) {
            panic!("report is broken");
        }

        fn render(&self, _error: &CoreError, _request: &Request, _debug: bool) -> Response {
            panic!("render is broken");
        }
    }

    #[test]
    fn test_should_translate_routing_errors_without_reporting() {
        let handler = CountingHandler { reports: 0.into() };
        let error = CoreError::MethodNotAllowed { allowed: vec![Method::GET, Method::PUT] };
        let response = translate(&error, &request(), &handler, false);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET, PUT"));
        assert_eq!(handler.reports.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_should_report_then_render_application_errors() {
        let handler = CountingHandler { reports: 0.into() };
        let error = CoreError::App(anyhow::anyhow!("database unreachable"));
        let response = translate(&error, &request(), &handler, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body().as_ref(), b"rendered");
        assert_eq!(response.exception(), Some("database unreachable"));
        assert_eq!(handler.reports.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_should_fall_back_when_handler_panics() {
        let error = CoreError::App(anyhow::anyhow!("boom"));
        let response = translate(&error, &request(), &BrokenHandler, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body().as_ref(), b"Internal Server Error");
    }

    #[test]
    fn test_should_expose_error_text_in_debug_fallback() {
        let error = CoreError::App(anyhow::anyhow!("boom"));
        let response = translate(&error, &request(), &BrokenHandler, true);
        assert_eq!(response.body().as_ref(), b"boom");
    }

    #[test]
    fn test_should_render_json_for_json_clients() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", "application/json".parse().expect("valid header"));
        let req = Request::new(
            Method::GET,
            Uri::from_static("/widgets"),
            Version::HTTP_11,
            headers,
            Bytes::new(),
        );
        let error = CoreError::MissingArgument { name: "id".to_owned() };
        let response = translate(&error, &req, &DefaultExceptionHandler, true);
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body: serde_json::Value =
            serde_json::from_slice(response.body()).expect("valid json");
        assert_eq!(body["code"], 500);
    }
}
