//! Onion-style middleware composition.
//!
//! A composed callable wraps the terminal handler invocation in the route's
//! middleware, first middleware outermost. Control threads a [`Flow`] value
//! instead of unwinding: a short-circuit response travels as [`Flow::Jump`]
//! and skips every post-processing step on the way out, while a normal
//! [`Flow::Respond`] may be rewritten by each middleware in turn.

use std::sync::Arc;

use mon_model::{Request, Response};

/// The value threaded through the middleware chain.
#[derive(Debug)]
pub enum Flow {
    /// A normal response; middleware post-processing applies.
    Respond(Response),
    /// A short-circuit response carried verbatim to the boundary.
    Jump(Response),
}

impl Flow {
    /// Rewrite a normal response, leaving jumps untouched. This is how a
    /// post-processing middleware honors the short-circuit contract.
    #[must_use]
    pub fn map(self, f: impl FnOnce(Response) -> Response) -> Self {
        match self {
            Self::Respond(response) => Self::Respond(f(response)),
            jump @ Self::Jump(_) => jump,
        }
    }

    /// Unwrap into the response to send. Jumps and normal responses are
    /// indistinguishable past the pipeline boundary.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Respond(response) | Self::Jump(response) => response,
        }
    }

    /// Whether this is a short-circuit.
    #[must_use]
    pub fn is_jump(&self) -> bool {
        matches!(self, Self::Jump(_))
    }
}

/// The continuation handed to a middleware: the rest of the chain.
pub trait Next {
    /// Run the remaining chain (further middleware, then the terminal
    /// handler invocation).
    fn run(&self, request: &mut Request) -> Flow;
}

/// The middleware contract.
///
/// A middleware may run `next` and return its flow unchanged, post-process
/// it via [`Flow::map`], or skip `next` entirely and answer itself.
pub trait Middleware: Send + Sync {
    /// Process one request within the chain.
    fn process(&self, request: &mut Request, next: &dyn Next) -> Flow;
}

impl std::fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Middleware")
    }
}

/// A fully composed, cache-ready callable for one matched route.
pub type Composed = Arc<dyn Fn(&mut Request) -> Flow + Send + Sync>;

struct ComposedNext(Composed);

impl Next for ComposedNext {
    fn run(&self, request: &mut Request) -> Flow {
        (self.0)(request)
    }
}

/// Fold the chain right-to-left around the terminal callable, so the first
/// middleware in `chain` is outermost.
#[must_use]
pub fn compose(chain: &[Arc<dyn Middleware>], terminal: Composed) -> Composed {
    chain.iter().rev().fold(terminal, |next, mw| {
        let mw = Arc::clone(mw);
        Arc::new(move |request: &mut Request| {
            mw.process(request, &ComposedNext(Arc::clone(&next)))
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri, Version};

    use super::*;

    fn request() -> Request {
        Request::new(
            Method::GET,
            Uri::from_static("/"),
            Version::HTTP_11,
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    /// Records its marker on entry and exit.
    struct Marker {
        label: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Marker {
        fn process(&self, request: &mut Request, next: &dyn Next) -> Flow {
            self.trace.lock().expect("trace lock").push(format!("{}:in", self.label));
            let flow = next.run(request);
            self.trace.lock().expect("trace lock").push(format!("{}:out", self.label));
            flow
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn process(&self, _request: &mut Request, _next: &dyn Next) -> Flow {
            Flow::Respond(Response::new(StatusCode::FORBIDDEN))
        }
    }

    fn terminal_with(trace: Arc<Mutex<Vec<String>>>) -> Composed {
        Arc::new(move |_request: &mut Request| {
            trace.lock().expect("trace lock").push("handler".to_owned());
            Flow::Respond(Response::new(StatusCode::OK))
        })
    }

    #[test]
    fn test_should_run_middleware_as_an_onion() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Marker { label: "a", trace: Arc::clone(&trace) }),
            Arc::new(Marker { label: "b", trace: Arc::clone(&trace) }),
        ];
        let composed = compose(&chain, terminal_with(Arc::clone(&trace)));

        let flow = composed(&mut request());
        assert_eq!(flow.into_response().status(), StatusCode::OK);
        assert_eq!(
            *trace.lock().expect("trace lock"),
            vec!["a:in", "b:in", "handler", "b:out", "a:out"],
        );
    }

    #[test]
    fn test_should_short_circuit_without_reaching_handler() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Marker { label: "a", trace: Arc::clone(&trace) }),
            Arc::new(ShortCircuit),
        ];
        let composed = compose(&chain, terminal_with(Arc::clone(&trace)));

        let flow = composed(&mut request());
        assert_eq!(flow.into_response().status(), StatusCode::FORBIDDEN);
        // The handler never ran; the outer middleware still unwound.
        assert_eq!(*trace.lock().expect("trace lock"), vec!["a:in", "a:out"]);
    }

    #[test]
    fn test_should_skip_post_processing_on_jump() {
        let jump_terminal: Composed = Arc::new(|_request: &mut Request| {
            Flow::Jump(Response::redirect("/login"))
        });

        struct Tagger;
        impl Middleware for Tagger {
            fn process(&self, request: &mut Request, next: &dyn Next) -> Flow {
                next.run(request).map(|r| r.with_header("x-tagged", "yes"))
            }
        }

        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(Tagger)];
        let composed = compose(&chain, jump_terminal);

        let flow = composed(&mut request());
        assert!(flow.is_jump());
        let response = flow.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.header("x-tagged").is_none());
    }

    #[test]
    fn test_should_map_normal_flow_only() {
        let respond = Flow::Respond(Response::new(StatusCode::OK));
        let mapped = respond.map(|r| r.with_status(StatusCode::CREATED));
        assert_eq!(mapped.into_response().status(), StatusCode::CREATED);

        let jump = Flow::Jump(Response::new(StatusCode::FOUND));
        let untouched = jump.map(|r| r.with_status(StatusCode::CREATED));
        assert_eq!(untouched.into_response().status(), StatusCode::FOUND);
    }
}
