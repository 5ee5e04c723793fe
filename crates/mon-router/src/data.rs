//! Serializable route metadata.
//!
//! [`RouteData`] is a flat, serde-friendly snapshot of one registered route,
//! used by tooling that lists routes or persists and rebuilds a table. The
//! handler payload is reduced to a string through [`Describe`] and resolved
//! back through a caller-supplied lookup when rebuilding.

use std::collections::HashMap;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::RouterError;
use crate::table::{RouteId, Router};

/// A handler payload that can be reduced to a stable string identifier.
pub trait Describe {
    /// The identifier persisted in [`RouteData::handler`].
    fn describe(&self) -> String;
}

impl Describe for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

impl Describe for &str {
    fn describe(&self) -> String {
        (*self).to_owned()
    }
}

/// One route, flattened for serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteData {
    /// Uppercase method names. Empty for the wildcard fallback.
    pub methods: Vec<String>,
    /// The raw path pattern as registered.
    pub pattern: String,
    /// The handler identifier from [`Describe::describe`].
    pub handler: String,
    /// Middleware identifiers in composition order.
    pub middleware: Vec<String>,
    /// The route name, if one was assigned.
    pub name: Option<String>,
}

impl<H: Describe> Router<H> {
    /// Snapshot every registered route, in registration order.
    #[must_use]
    pub fn get_data(&self) -> Vec<RouteData> {
        self.routes()
            .iter()
            .map(|route| RouteData {
                methods: route.methods.iter().map(Method::to_string).collect(),
                pattern: route.pattern.raw().to_owned(),
                handler: route.handler.describe(),
                middleware: route.middleware.clone(),
                name: route.name.clone(),
            })
            .collect()
    }
}

impl<H> Router<H> {
    /// Rebuild a table from persisted route data.
    ///
    /// `resolve` maps each persisted handler identifier back to a payload;
    /// an identifier it does not know fails the whole rebuild.
    pub fn set_data<F>(data: Vec<RouteData>, mut resolve: F) -> Result<Self, RouterError>
    where
        F: FnMut(&str) -> Option<H>,
    {
        let mut router = Self::new();
        for entry in data {
            let handler = resolve(&entry.handler)
                .ok_or_else(|| RouterError::UnknownHandler(entry.handler.clone()))?;
            let methods = entry
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.as_bytes()).map_err(|_| RouterError::Pattern {
                        pattern: entry.pattern.clone(),
                        reason: format!("invalid method `{m}`"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let id = router.register(&methods, &entry.pattern, handler)?;
            if !entry.middleware.is_empty() {
                router.middleware(id, entry.middleware);
            }
            if let Some(name) = &entry.name {
                router.name(id, name)?;
            }
        }
        Ok(router)
    }
}

/// Convenience wrapper over [`Router::url`] for callers holding owned pairs.
pub fn url_for<H>(
    router: &Router<H>,
    name: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<String, RouterError> {
    router.url(name, &vars.into_iter().collect::<HashMap<_, _>>())
}
