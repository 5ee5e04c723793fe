//! The named middleware registry.
//!
//! Middleware instances are shared singletons, registered once at startup
//! under an identifier and resolved by name when a route's chain is
//! composed.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::CoreError;
use crate::pipeline::Middleware;

/// Named middleware singletons.
#[derive(Default)]
pub struct MiddlewareRegistry {
    entries: DashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware instance under an identifier. Re-registering an
    /// identifier replaces the previous instance.
    pub fn register<M: Middleware + 'static>(&self, name: &str, middleware: M) {
        self.entries.insert(name.to_owned(), Arc::new(middleware));
    }

    /// Resolve one middleware by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Middleware>, CoreError> {
        self.entries
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| CoreError::UnknownMiddleware(name.to_owned()))
    }

    /// Resolve an ordered chain of names into instances, failing on the
    /// first unknown identifier.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Arc<dyn Middleware>>, CoreError> {
        names.iter().map(|name| self.get(name)).collect()
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use mon_model::Request;

    use super::*;
    use crate::pipeline::{Flow, Next};

    struct Noop;

    impl Middleware for Noop {
        fn process(&self, request: &mut Request, next: &dyn Next) -> Flow {
            next.run(request)
        }
    }

    #[test]
    fn test_should_resolve_registered_middleware() {
        let registry = MiddlewareRegistry::new();
        registry.register("noop", Noop);
        assert!(registry.get("noop").is_ok());
    }

    #[test]
    fn test_should_fail_chain_resolution_on_unknown_name() {
        let registry = MiddlewareRegistry::new();
        registry.register("noop", Noop);
        let err = registry
            .resolve(&["noop".to_owned(), "ghost".to_owned()])
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownMiddleware(n) if n == "ghost"));
    }
}
