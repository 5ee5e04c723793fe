//! Handler invocation with explicit binding plans.
//!
//! Each handler declares, at registration time, where its parameters come
//! from: the current request, a route variable (with numeric coercion and an
//! optional default), or a container service. The invoker resolves the plan
//! against the matched request and hands the handler an [`Invocation`]
//! context with the bound values.
//!
//! Numeric coercion is deliberately aggressive: a route variable becomes an
//! integer or float whenever the whole string parses as one, even where a
//! handler might prefer the raw string (a fully numeric username, say).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mon_model::{HandlerOutcome, Request};
use tracing::trace;

use crate::container::Container;
use crate::error::CoreError;
use crate::handler::{Handler, HandlerRef};

/// A route variable after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    /// The whole string parsed as an `i64`.
    Int(i64),
    /// The whole string parsed as an `f64` (but not as an `i64`).
    Float(f64),
    /// Everything else, verbatim.
    Str(String),
}

impl VarValue {
    /// Coerce a raw route variable. Only a full-string parse counts;
    /// partial numeric prefixes stay strings.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        if let Ok(int) = raw.parse::<i64>() {
            Self::Int(int)
        } else if let Ok(float) = raw.parse::<f64>() {
            Self::Float(float)
        } else {
            Self::Str(raw.to_owned())
        }
    }

    /// The integer value, if this coerced to one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The float value; integers widen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// The string value, only if no coercion applied.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Where one handler parameter's value comes from.
#[derive(Debug, Clone)]
pub enum ParamSource {
    /// The current request; the handler reads it off the invocation context.
    Request,
    /// A same-named route variable, coerced; falls back to the default, and
    /// fails the request if neither is present.
    Var {
        /// Used when the route variable is absent.
        default: Option<VarValue>,
    },
    /// A container service, resolved by identifier.
    Service(String),
}

/// One entry of a handler's binding plan.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// The declared parameter name.
    pub name: String,
    /// Where its value comes from.
    pub source: ParamSource,
}

impl ParamSpec {
    /// A parameter bound to the current request.
    #[must_use]
    pub fn request(name: &str) -> Self {
        Self { name: name.to_owned(), source: ParamSource::Request }
    }

    /// A required route-variable parameter.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self { name: name.to_owned(), source: ParamSource::Var { default: None } }
    }

    /// A route-variable parameter with a default.
    #[must_use]
    pub fn var_or(name: &str, default: VarValue) -> Self {
        Self {
            name: name.to_owned(),
            source: ParamSource::Var { default: Some(default) },
        }
    }

    /// A parameter resolved from the container.
    #[must_use]
    pub fn service(name: &str, id: &str) -> Self {
        Self { name: name.to_owned(), source: ParamSource::Service(id.to_owned()) }
    }
}

/// The bound context a handler executes against.
pub struct Invocation<'a> {
    request: &'a Request,
    args: HashMap<String, VarValue>,
    container: &'a Container,
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("path", &self.request.path())
            .field("args", &self.args)
            .finish()
    }
}

impl Invocation<'_> {
    /// The current request.
    #[must_use]
    pub fn request(&self) -> &Request {
        self.request
    }

    /// A bound route-variable argument.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&VarValue> {
        self.args.get(name)
    }

    /// A bound argument as an integer.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.args.get(name).and_then(VarValue::as_int)
    }

    /// A bound argument as a float (integers widen).
    #[must_use]
    pub fn float(&self, name: &str) -> Option<f64> {
        self.args.get(name).and_then(VarValue::as_float)
    }

    /// A bound argument's display form, whatever it coerced to.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.args.get(name).map(ToString::to_string)
    }

    /// Resolve a container service from inside the handler.
    pub fn service<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, CoreError> {
        self.container.get(id)
    }
}

/// Resolves binding plans and invokes handlers.
#[derive(Debug)]
pub struct Invoker {
    fresh_controllers: bool,
}

impl Invoker {
    /// Create an invoker. `fresh_controllers` switches controller resolution
    /// from shared singletons to per-request construction.
    #[must_use]
    pub fn new(fresh_controllers: bool) -> Self {
        Self { fresh_controllers }
    }

    /// Resolve the binding plan against the matched request.
    ///
    /// Route variables win over defaults when present; a required variable
    /// with no default fails the request. Service entries are checked for
    /// presence here so a missing registration surfaces as a binding error
    /// rather than deep inside the handler.
    pub fn bind(
        &self,
        specs: &[ParamSpec],
        request: &Request,
        container: &Container,
    ) -> Result<HashMap<String, VarValue>, CoreError> {
        let mut args = HashMap::new();
        for spec in specs {
            match &spec.source {
                ParamSource::Request => {}
                ParamSource::Var { default } => {
                    let value = match request.param(&spec.name) {
                        Some(raw) => VarValue::coerce(raw),
                        None => default.clone().ok_or_else(|| CoreError::MissingArgument {
                            name: spec.name.clone(),
                        })?,
                    };
                    args.insert(spec.name.clone(), value);
                }
                ParamSource::Service(id) => {
                    if !container.has_service(id) {
                        return Err(CoreError::UnknownService(id.clone()));
                    }
                }
            }
        }
        Ok(args)
    }

    /// Bind and invoke one handler, producing its raw outcome.
    pub fn invoke(
        &self,
        handler: &Handler,
        request: &Request,
        container: &Container,
    ) -> Result<HandlerOutcome, CoreError> {
        let args = self.bind(&handler.params, request, container)?;
        let ctx = Invocation { request, args, container };
        match &handler.reference {
            HandlerRef::Closure(f) => Ok(f(&ctx)),
            HandlerRef::Method { controller, action } => {
                trace!(controller, action, "invoking controller action");
                let instance = container.controller(controller, self.fresh_controllers)?;
                instance
                    .action(action, &ctx)
                    .ok_or_else(|| CoreError::UnknownAction {
                        controller: controller.clone(),
                        action: action.clone(),
                    })
            }
        }
    }
}
