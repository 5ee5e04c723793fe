//! The route table: registration, group scoping, and dispatch.

use std::collections::HashMap;

use http::Method;
use tracing::debug;

use crate::RouterError;
use crate::pattern::Pattern;

/// The methods covered by [`Router::any`].
const ALL_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// One registered route. Created during the route-definition phase and
/// immutable once dispatch begins.
#[derive(Debug, Clone)]
pub struct Route<H> {
    /// The HTTP methods this route answers. Empty means any method (the
    /// fallback route).
    pub methods: Vec<Method>,
    /// The compiled path pattern.
    pub pattern: Pattern,
    /// The handler payload.
    pub handler: H,
    /// Middleware identifiers, group middleware first.
    pub middleware: Vec<String>,
    /// The unique route name, if one was assigned.
    pub name: Option<String>,
}

/// An opaque handle to a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteId(usize);

/// The result of resolving `(method, path)` against the table.
#[derive(Debug)]
pub enum MatchResult<H> {
    /// A route matched; carries the handler, its middleware chain, and the
    /// extracted path variables.
    Found {
        /// The matched handler payload.
        handler: H,
        /// Middleware identifiers in composition order.
        middleware: Vec<String>,
        /// Extracted path variables.
        params: HashMap<String, String>,
    },
    /// The path is known under at least one other method.
    MethodNotAllowed {
        /// The methods that would have matched.
        allowed: Vec<Method>,
    },
    /// No route matches the path under any method.
    NotFound,
}

/// A scoped registration context pushed by [`Router::group`].
#[derive(Debug)]
struct GroupFrame {
    prefix: String,
    middleware: Vec<String>,
}

/// The compiled route table, generic over the handler payload.
///
/// Registration happens during startup; the table is read-only during
/// steady-state dispatch. Static paths are resolved through a per-method
/// exact-path map; parametric routes are scanned in registration order, so
/// the first-registered route wins on ambiguous overlap.
#[derive(Debug)]
pub struct Router<H> {
    routes: Vec<Route<H>>,
    static_paths: HashMap<Method, HashMap<String, usize>>,
    dynamic: HashMap<Method, Vec<usize>>,
    names: HashMap<String, usize>,
    fallback: Option<usize>,
    groups: Vec<GroupFrame>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    /// Create an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            static_paths: HashMap::new(),
            dynamic: HashMap::new(),
            names: HashMap::new(),
            fallback: None,
            groups: Vec::new(),
        }
    }

    /// Register a route for the given methods.
    ///
    /// The pattern is joined onto the prefix of any enclosing groups, and
    /// group middleware is prepended to the route's middleware list.
    pub fn register(
        &mut self,
        methods: &[Method],
        pattern: &str,
        handler: H,
    ) -> Result<RouteId, RouterError> {
        let full = self.join_prefix(pattern);
        let compiled = Pattern::compile(&full)?;
        let idx = self.routes.len();

        if compiled.is_wildcard() {
            self.fallback = Some(idx);
        } else {
            for method in methods {
                if compiled.is_static() {
                    let bucket = self.static_paths.entry(method.clone()).or_default();
                    if bucket.contains_key(compiled.raw()) {
                        return Err(RouterError::DuplicateRoute {
                            method: method.clone(),
                            path: compiled.raw().to_owned(),
                        });
                    }
                    bucket.insert(compiled.raw().to_owned(), idx);
                } else {
                    self.dynamic.entry(method.clone()).or_default().push(idx);
                }
            }
        }

        debug!(pattern = %compiled.raw(), methods = ?methods, "registered route");
        self.routes.push(Route {
            methods: methods.to_vec(),
            pattern: compiled,
            handler,
            middleware: self.group_middleware(),
            name: None,
        });
        Ok(RouteId(idx))
    }

    /// Register a GET route.
    pub fn get(&mut self, pattern: &str, handler: H) -> Result<RouteId, RouterError> {
        self.register(&[Method::GET], pattern, handler)
    }

    /// Register a POST route.
    pub fn post(&mut self, pattern: &str, handler: H) -> Result<RouteId, RouterError> {
        self.register(&[Method::POST], pattern, handler)
    }

    /// Register a PUT route.
    pub fn put(&mut self, pattern: &str, handler: H) -> Result<RouteId, RouterError> {
        self.register(&[Method::PUT], pattern, handler)
    }

    /// Register a DELETE route.
    pub fn delete(&mut self, pattern: &str, handler: H) -> Result<RouteId, RouterError> {
        self.register(&[Method::DELETE], pattern, handler)
    }

    /// Register a route answering every standard method.
    pub fn any(&mut self, pattern: &str, handler: H) -> Result<RouteId, RouterError> {
        self.register(&ALL_METHODS, pattern, handler)
    }

    /// Register the wildcard fallback route, consulted when nothing else
    /// matches before a 404 is surfaced.
    pub fn fallback(&mut self, handler: H) -> Result<RouteId, RouterError> {
        self.register(&[], "*", handler)
    }

    /// Run `build` inside a scoped registration context carrying a path
    /// prefix and a middleware list, returning whatever the builder returns
    /// (a `Result` builder propagates registration failures to the caller).
    ///
    /// The prior context is restored when the builder returns, including
    /// when it panics.
    pub fn group<F, T>(&mut self, prefix: &str, middleware: Vec<String>, build: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.groups.push(GroupFrame {
            prefix: prefix.trim_end_matches('/').to_owned(),
            middleware,
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| build(self)));
        self.groups.pop();
        match result {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Assign a unique name to a route. Names are process-wide unique and
    /// back reverse URL building.
    pub fn name(&mut self, id: RouteId, name: &str) -> Result<(), RouterError> {
        if self.names.contains_key(name) {
            return Err(RouterError::DuplicateName(name.to_owned()));
        }
        self.names.insert(name.to_owned(), id.0);
        self.routes[id.0].name = Some(name.to_owned());
        Ok(())
    }

    /// Append middleware identifiers to a route.
    pub fn middleware(&mut self, id: RouteId, middleware: impl IntoIterator<Item = String>) {
        self.routes[id.0].middleware.extend(middleware);
    }

    /// Look up a named route.
    pub fn named(&self, name: &str) -> Result<&Route<H>, RouterError> {
        self.names
            .get(name)
            .map(|&idx| &self.routes[idx])
            .ok_or_else(|| RouterError::UnknownName(name.to_owned()))
    }

    /// Reverse-build a URL for a named route from a variable map.
    pub fn url(
        &self,
        name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<String, RouterError> {
        self.named(name)?.pattern.fill(vars)
    }

    /// All registered routes, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    /// Join the pattern onto enclosing group prefixes, normalizing to a
    /// single slash at every boundary. The `*` fallback is never prefixed.
    fn join_prefix(&self, pattern: &str) -> String {
        if pattern == "*" {
            return pattern.to_owned();
        }
        let mut full = String::new();
        for part in self.groups.iter().map(|f| f.prefix.as_str()).chain([pattern]) {
            let trimmed = part.trim_start_matches('/');
            if trimmed.is_empty() {
                continue;
            }
            full.push('/');
            full.push_str(trimmed);
        }
        if full.is_empty() {
            pattern.to_owned()
        } else {
            full
        }
    }

    fn group_middleware(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|f| f.middleware.iter().cloned())
            .collect()
    }
}

impl<H: Clone> Router<H> {
    /// Resolve `(method, path)` to a match result.
    ///
    /// Static paths take precedence over parametric routes; parametric
    /// routes are tried in registration order. A path known under a
    /// different method yields [`MatchResult::MethodNotAllowed`].
    #[must_use]
    pub fn dispatch(&self, method: &Method, path: &str) -> MatchResult<H> {
        if let Some(&idx) = self.static_paths.get(method).and_then(|m| m.get(path)) {
            return self.found(idx, HashMap::new());
        }

        if let Some(candidates) = self.dynamic.get(method) {
            for &idx in candidates {
                if let Some(params) = self.routes[idx].pattern.match_path(path) {
                    return self.found(idx, params);
                }
            }
        }

        let allowed = self.allowed_methods(method, path);
        if allowed.is_empty() {
            MatchResult::NotFound
        } else {
            MatchResult::MethodNotAllowed { allowed }
        }
    }

    /// The fallback route's handler and middleware, if one is registered.
    #[must_use]
    pub fn fallback_match(&self) -> Option<(H, Vec<String>)> {
        self.fallback.map(|idx| {
            let route = &self.routes[idx];
            (route.handler.clone(), route.middleware.clone())
        })
    }

    fn found(&self, idx: usize, params: HashMap<String, String>) -> MatchResult<H> {
        let route = &self.routes[idx];
        MatchResult::Found {
            handler: route.handler.clone(),
            middleware: route.middleware.clone(),
            params,
        }
    }

    /// Which other methods would match this path.
    fn allowed_methods(&self, requested: &Method, path: &str) -> Vec<Method> {
        let mut allowed = Vec::new();
        for method in &ALL_METHODS {
            if method == requested || allowed.contains(method) {
                continue;
            }
            let static_hit = self
                .static_paths
                .get(method)
                .is_some_and(|m| m.contains_key(path));
            let dynamic_hit = self.dynamic.get(method).is_some_and(|candidates| {
                candidates
                    .iter()
                    .any(|&idx| self.routes[idx].pattern.match_path(path).is_some())
            });
            if static_hit || dynamic_hit {
                allowed.push(method.clone());
            }
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<&'static str> {
        Router::new()
    }

    fn assert_found(result: &MatchResult<&'static str>, handler: &str) {
        match result {
            MatchResult::Found { handler: h, .. } => assert_eq!(*h, handler),
            other => panic!("expected Found({handler}), got {other:?}"),
        }
    }

    #[test]
    fn test_should_dispatch_static_route() {
        let mut r = router();
        r.get("/users/list", "list").expect("register");
        assert_found(&r.dispatch(&Method::GET, "/users/list"), "list");
    }

    #[test]
    fn test_should_prefer_static_over_parametric() {
        let mut r = router();
        r.get("/users/{id}", "show").expect("register");
        r.get("/users/new", "new").expect("register");
        // Registration order does not matter: exact paths always win.
        assert_found(&r.dispatch(&Method::GET, "/users/new"), "new");
        assert_found(&r.dispatch(&Method::GET, "/users/42"), "show");
    }

    #[test]
    fn test_should_pick_first_registered_on_parametric_overlap() {
        let mut r = router();
        r.get("/files/{name}", "first").expect("register");
        r.get("/files/{other}", "second").expect("register");
        assert_found(&r.dispatch(&Method::GET, "/files/a.txt"), "first");
    }

    #[test]
    fn test_should_extract_params_on_found() {
        let mut r = router();
        r.get(r"/users/{id:\d+}", "show").expect("register");
        let MatchResult::Found { params, .. } = r.dispatch(&Method::GET, "/users/42") else {
            panic!("expected Found");
        };
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_should_report_method_not_allowed() {
        let mut r = router();
        r.get(r"/users/{id:\d+}", "show").expect("register");
        let MatchResult::MethodNotAllowed { allowed } = r.dispatch(&Method::POST, "/users/42")
        else {
            panic!("expected MethodNotAllowed");
        };
        assert_eq!(allowed, vec![Method::GET]);
    }

    #[test]
    fn test_should_report_not_found_for_unknown_path() {
        let mut r = router();
        r.get("/users", "index").expect("register");
        assert!(matches!(
            r.dispatch(&Method::GET, "/missing"),
            MatchResult::NotFound,
        ));
    }

    #[test]
    fn test_should_reject_constraint_violation_as_not_found() {
        let mut r = router();
        r.get(r"/users/{id:\d+}", "show").expect("register");
        assert!(matches!(
            r.dispatch(&Method::GET, "/users/abc"),
            MatchResult::NotFound,
        ));
    }

    #[test]
    fn test_should_reject_duplicate_static_route() {
        let mut r = router();
        r.get("/users", "a").expect("register");
        let err = r.get("/users", "b").unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_should_apply_group_prefix_and_middleware() {
        let mut r = router();
        r.group("/admin", vec!["auth".to_owned()], |r| {
            r.get("/dashboard", "dash").expect("register");
        });
        let MatchResult::Found { middleware, .. } = r.dispatch(&Method::GET, "/admin/dashboard")
        else {
            panic!("expected Found");
        };
        assert_eq!(middleware, vec!["auth"]);
    }

    #[test]
    fn test_should_join_group_prefix_with_single_slash() {
        let mut r = router();
        r.group("/api", vec![], |r| {
            r.get("users", "index").expect("register");
            r.get("/", "root").expect("register");
        });
        // A missing or doubled slash at the boundary normalizes to one.
        assert_found(&r.dispatch(&Method::GET, "/api/users"), "index");
        assert_found(&r.dispatch(&Method::GET, "/api"), "root");
        assert!(matches!(
            r.dispatch(&Method::GET, "/apiusers"),
            MatchResult::NotFound,
        ));
    }

    #[test]
    fn test_should_nest_group_prefixes() {
        let mut r = router();
        r.group("/api", vec!["throttle".to_owned()], |r| {
            r.group("/v1", vec!["auth".to_owned()], |r| {
                r.get("/users", "users").expect("register");
            });
        });
        let MatchResult::Found { middleware, .. } = r.dispatch(&Method::GET, "/api/v1/users")
        else {
            panic!("expected Found");
        };
        assert_eq!(middleware, vec!["throttle", "auth"]);
    }

    #[test]
    fn test_should_propagate_builder_errors_out_of_group() {
        let mut r = router();
        let result = r.group("/api", vec![], |r| -> Result<(), RouterError> {
            r.get("/users", "a")?;
            r.get("/users", "b")?;
            Ok(())
        });
        assert!(matches!(
            result.unwrap_err(),
            RouterError::DuplicateRoute { .. },
        ));
        // The failed builder still popped its context.
        r.get("/ok", "ok").expect("register");
        assert_found(&r.dispatch(&Method::GET, "/ok"), "ok");
    }

    #[test]
    fn test_should_restore_group_context_after_panic() {
        let mut r = router();
        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            r.group("/broken", vec![], |_| panic!("builder failed"));
        }));
        assert!(panicked.is_err());
        // Context was popped: new routes are not prefixed.
        r.get("/ok", "ok").expect("register");
        assert_found(&r.dispatch(&Method::GET, "/ok"), "ok");
    }

    #[test]
    fn test_should_reject_duplicate_route_name() {
        let mut r = router();
        let a = r.get("/a", "a").expect("register");
        let b = r.get("/b", "b").expect("register");
        r.name(a, "home").expect("first name");
        let err = r.name(b, "home").unwrap_err();
        assert!(matches!(err, RouterError::DuplicateName(n) if n == "home"));
    }

    #[test]
    fn test_should_fail_lookup_of_unregistered_name() {
        let r = router();
        assert!(matches!(
            r.named("nope").unwrap_err(),
            RouterError::UnknownName(n) if n == "nope",
        ));
    }

    #[test]
    fn test_should_build_url_for_named_route() {
        let mut r = router();
        let id = r.get(r"/users/{id:\d+}", "show").expect("register");
        r.name(id, "users.show").expect("name");
        let url = r
            .url(
                "users.show",
                &HashMap::from([("id".to_owned(), "42".to_owned())]),
            )
            .expect("build url");
        assert_eq!(url, "/users/42");
    }

    #[test]
    fn test_should_use_fallback_route() {
        let mut r = router();
        assert!(r.fallback_match().is_none());
        r.fallback("catch-all").expect("register");
        let (handler, middleware) = r.fallback_match().expect("fallback");
        assert_eq!(handler, "catch-all");
        assert!(middleware.is_empty());
    }

    #[test]
    fn test_should_not_consider_fallback_for_method_not_allowed() {
        let mut r = router();
        r.fallback("catch-all").expect("register");
        r.get("/only-get", "g").expect("register");
        // The fallback answers any method, so POST /only-get is still 405.
        assert!(matches!(
            r.dispatch(&Method::POST, "/only-get"),
            MatchResult::MethodNotAllowed { .. },
        ));
    }
}
