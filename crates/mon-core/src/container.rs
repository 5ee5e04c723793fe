//! The service container.
//!
//! Holds shared service singletons (keyed by identifier, typed via `Any`
//! downcast) and controller factories. Controllers resolve to shared
//! singletons by default; a configuration flag switches them to
//! fresh-per-request construction. Registration happens at startup; during
//! steady-state dispatch the container is effectively read-only apart from
//! singleton memoization.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::CoreError;
use crate::handler::Controller;

type ControllerFactory = Arc<dyn Fn() -> Arc<dyn Controller> + Send + Sync>;

/// Shared services and controller factories.
#[derive(Default)]
pub struct Container {
    services: DashMap<String, Arc<dyn Any + Send + Sync>>,
    factories: DashMap<String, ControllerFactory>,
    singletons: DashMap<String, Arc<dyn Controller>>,
}

impl Container {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared service instance under an identifier.
    pub fn register_service<T: Any + Send + Sync>(&self, id: &str, service: Arc<T>) {
        self.services.insert(id.to_owned(), service);
    }

    /// Whether a service is registered under this identifier.
    #[must_use]
    pub fn has_service(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    /// Resolve a shared service, downcast to its concrete type.
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, CoreError> {
        let entry = self
            .services
            .get(id)
            .ok_or_else(|| CoreError::UnknownService(id.to_owned()))?;
        Arc::clone(entry.value())
            .downcast::<T>()
            .map_err(|_| CoreError::ServiceType(id.to_owned()))
    }

    /// Register a controller factory under the controller's name.
    pub fn register_controller<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Controller> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_owned(), Arc::new(factory));
    }

    /// Resolve a controller instance.
    ///
    /// With `fresh` set, the factory runs on every call; otherwise the first
    /// instance is memoized and shared.
    pub fn controller(&self, name: &str, fresh: bool) -> Result<Arc<dyn Controller>, CoreError> {
        if !fresh {
            if let Some(instance) = self.singletons.get(name) {
                return Ok(Arc::clone(instance.value()));
            }
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| CoreError::UnknownController(name.to_owned()))?;
        let instance = (factory.value())();
        if !fresh {
            self.singletons.insert(name.to_owned(), Arc::clone(&instance));
        }
        Ok(instance)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.services.len())
            .field("controllers", &self.factories.len())
            .finish()
    }
}
