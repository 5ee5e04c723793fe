//! Handler references and the controller contract.
//!
//! A handler is one of a closed set of variants: a closure, or a
//! controller/action pair (the `"Controller@action"` string form parses into
//! the latter). Alongside the reference, a [`Handler`] carries the binding
//! plan describing how each declared parameter is supplied at invocation
//! time.

use std::fmt;
use std::sync::Arc;

use mon_model::HandlerOutcome;
use mon_router::Describe;

use crate::error::CoreError;
use crate::invoker::{Invocation, ParamSpec};

/// A controller groups related actions behind one resolvable name.
///
/// Instances come from the container, shared or fresh-per-request depending
/// on configuration. `action` returns `None` for an unknown action name,
/// which the invoker turns into an error response.
pub trait Controller: Send + Sync {
    /// Dispatch a named action with the bound invocation context.
    fn action(&self, name: &str, ctx: &Invocation<'_>) -> Option<HandlerOutcome>;
}

impl fmt::Debug for dyn Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Controller")
    }
}

/// The closure form of a handler.
pub type HandlerFn = dyn Fn(&Invocation<'_>) -> HandlerOutcome + Send + Sync;

/// Which callable answers a matched route.
#[derive(Clone)]
pub enum HandlerRef {
    /// A free-standing closure.
    Closure(Arc<HandlerFn>),
    /// A controller/action pair resolved through the container.
    Method {
        /// The registered controller name.
        controller: String,
        /// The action name on that controller.
        action: String,
    },
}

impl HandlerRef {
    /// Wrap a closure.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> HandlerOutcome + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(f))
    }

    /// Parse the `"Controller@action"` string form.
    pub fn parse(spec: &str) -> Result<Self, CoreError> {
        match spec.split_once('@') {
            Some((controller, action)) if !controller.is_empty() && !action.is_empty() => {
                Ok(Self::Method {
                    controller: controller.to_owned(),
                    action: action.to_owned(),
                })
            }
            _ => Err(CoreError::BadHandler(spec.to_owned())),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closure(_) => f.write_str("HandlerRef::Closure"),
            Self::Method { controller, action } => {
                write!(f, "HandlerRef::Method({controller}@{action})")
            }
        }
    }
}

/// A handler reference plus its binding plan. This is the payload the route
/// table carries for every registered route.
#[derive(Debug, Clone)]
pub struct Handler {
    /// The callable to invoke.
    pub reference: HandlerRef,
    /// How each declared parameter is supplied.
    pub params: Vec<ParamSpec>,
}

impl Handler {
    /// A handler with no declared parameters.
    #[must_use]
    pub fn new(reference: HandlerRef) -> Self {
        Self { reference, params: Vec::new() }
    }

    /// A closure handler.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> HandlerOutcome + Send + Sync + 'static,
    {
        Self::new(HandlerRef::closure(f))
    }

    /// A controller/action handler from the `"Controller@action"` form.
    pub fn method(spec: &str) -> Result<Self, CoreError> {
        Ok(Self::new(HandlerRef::parse(spec)?))
    }

    /// Attach the binding plan.
    #[must_use]
    pub fn with_params(mut self, params: Vec<ParamSpec>) -> Self {
        self.params = params;
        self
    }
}

impl Describe for Handler {
    fn describe(&self) -> String {
        match &self.reference {
            HandlerRef::Closure(_) => "closure".to_owned(),
            HandlerRef::Method { controller, action } => format!("{controller}@{action}"),
        }
    }
}
