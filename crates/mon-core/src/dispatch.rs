//! The dispatcher: orchestration from raw path to final response.
//!
//! Per request: path safety check, callback-cache probe, route resolution,
//! pipeline composition (cached for the next identical `(method, path)`),
//! execution, and error translation. Every code path converges on exactly
//! one response; nothing unwinds past this boundary.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::{Method, StatusCode};
use mon_model::{HandlerOutcome, Request, Response};
use mon_router::{MatchResult, Router};
use tracing::{debug, trace};

use crate::assemble;
use crate::cache::{CachedCallback, CallbackCache};
use crate::config::CoreConfig;
use crate::container::Container;
use crate::error::CoreError;
use crate::exception::{ExceptionHandler, translate};
use crate::handler::{Handler, HandlerRef};
use crate::invoker::Invoker;
use crate::middleware::MiddlewareRegistry;
use crate::pipeline::{Composed, Flow, compose};

/// The page sent when no route and no wildcard fallback match.
const NOT_FOUND_PAGE: &str = "<html><body><h1>404 Not Found</h1>\
<p>The requested resource was not found on this server.</p></body></html>";

/// Orchestrates the dispatch pipeline. Built once at startup and shared
/// read-only across requests.
pub struct Dispatcher {
    router: Router<Handler>,
    middleware: Arc<MiddlewareRegistry>,
    container: Arc<Container>,
    invoker: Arc<Invoker>,
    exception_handler: Arc<dyn ExceptionHandler>,
    config: CoreConfig,
    cache: CallbackCache,
    resolutions: AtomicU64,
}

impl Dispatcher {
    /// Assemble a dispatcher from its collaborators.
    #[must_use]
    pub fn new(
        router: Router<Handler>,
        middleware: Arc<MiddlewareRegistry>,
        container: Arc<Container>,
        exception_handler: Arc<dyn ExceptionHandler>,
        config: CoreConfig,
    ) -> Self {
        let invoker = Arc::new(Invoker::new(config.fresh_controllers));
        let cache = CallbackCache::new(config.callback_cache_max);
        Self {
            router,
            middleware,
            container,
            invoker,
            exception_handler,
            config,
            cache,
            resolutions: AtomicU64::new(0),
        }
    }

    /// Dispatch one request to its final response.
    pub fn dispatch(&self, mut request: Request) -> Response {
        if !path_is_safe(request.path(), self.config.reject_double_slash) {
            debug!(path = request.path(), "rejected unsafe path");
            return Response::new(StatusCode::NOT_FOUND);
        }

        let method = request.method().clone();
        let path = request.path().to_owned();
        match self.callback_for(&method, &path) {
            Ok(Some(entry)) => (entry.callable)(&mut request).into_response(),
            Ok(None) => Response::html(NOT_FOUND_PAGE).with_status(StatusCode::NOT_FOUND),
            Err(error) => translate(
                &error,
                &request,
                self.exception_handler.as_ref(),
                self.config.debug,
            ),
        }
    }

    /// The composed callable for a `(method, path)` pair: cache hit, or
    /// resolve-compose-cache.
    fn callback_for(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<Option<CachedCallback>, CoreError> {
        if let Some(hit) = self.cache.get(method, path) {
            trace!(%method, path, "callback cache hit");
            return Ok(Some(hit));
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        match self.router.dispatch(method, path) {
            MatchResult::Found { handler, middleware, params } => {
                let entry = self.compose_entry(handler, &middleware, params)?;
                self.cache.insert(method.clone(), path.to_owned(), entry.clone());
                Ok(Some(entry))
            }
            MatchResult::MethodNotAllowed { allowed } => {
                Err(CoreError::MethodNotAllowed { allowed })
            }
            MatchResult::NotFound => match self.router.fallback_match() {
                Some((handler, middleware)) => {
                    let entry = self.compose_entry(handler, &middleware, HashMap::new())?;
                    self.cache.insert(method.clone(), path.to_owned(), entry.clone());
                    Ok(Some(entry))
                }
                None => Ok(None),
            },
        }
    }

    /// Compose the middleware onion around the terminal invocation and wrap
    /// it so the cached callable re-attaches the route context on every run.
    fn compose_entry(
        &self,
        handler: Handler,
        middleware_names: &[String],
        params: HashMap<String, String>,
    ) -> Result<CachedCallback, CoreError> {
        let chain = self.middleware.resolve(middleware_names)?;
        let (controller, action) = match &handler.reference {
            HandlerRef::Method { controller, action } => {
                (Some(controller.clone()), Some(action.clone()))
            }
            HandlerRef::Closure(_) => (None, None),
        };

        let inner = compose(&chain, self.terminal(handler));
        let ctl = controller.clone();
        let act = action.clone();
        let callable: Composed = Arc::new(move |request: &mut Request| {
            request.set_params(params.clone());
            request.set_controller_action(ctl.clone(), act.clone());
            inner(request)
        });
        Ok(CachedCallback { callable, controller, action })
    }

    /// The innermost layer of the onion: invoke the handler, normalize the
    /// outcome, translate failures. Panic-safe, so a composed callable
    /// always yields a flow.
    fn terminal(&self, handler: Handler) -> Composed {
        let invoker = Arc::clone(&self.invoker);
        let container = Arc::clone(&self.container);
        let exception_handler = Arc::clone(&self.exception_handler);
        let debug = self.config.debug;
        Arc::new(move |request: &mut Request| {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                invoker.invoke(&handler, request, &container)
            }));
            match outcome {
                Ok(Ok(HandlerOutcome::Reply(reply))) => {
                    Flow::Respond(assemble::normalize(reply))
                }
                Ok(Ok(HandlerOutcome::Jump(response))) => Flow::Jump(response),
                Ok(Ok(HandlerOutcome::Fail(error))) => Flow::Respond(translate(
                    &CoreError::App(error),
                    request,
                    exception_handler.as_ref(),
                    debug,
                )),
                Ok(Err(error)) => Flow::Respond(translate(
                    &error,
                    request,
                    exception_handler.as_ref(),
                    debug,
                )),
                Err(panic) => Flow::Respond(translate(
                    &CoreError::Panic(panic_message(panic.as_ref())),
                    request,
                    exception_handler.as_ref(),
                    debug,
                )),
            }
        })
    }

    /// How many times the route table has been consulted (cache misses).
    #[must_use]
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// The composed-callable cache.
    #[must_use]
    pub fn cache(&self) -> &CallbackCache {
        &self.cache
    }

    /// The underlying route table, for reverse URL building and tooling.
    #[must_use]
    pub fn router(&self) -> &Router<Handler> {
        &self.router
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.routes().len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Whether a raw request path is safe to route. Traversal segments,
/// backslashes, and NUL bytes are always rejected; double slashes only when
/// configured.
#[must_use]
pub fn path_is_safe(path: &str, reject_double_slash: bool) -> bool {
    if path.contains('\\') || path.contains('\0') {
        return false;
    }
    if reject_double_slash && path.contains("//") {
        return false;
    }
    !path.split('/').any(|segment| segment == "..")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}
