//! The core error taxonomy.

use http::{Method, StatusCode};

/// Everything that can go wrong between route resolution and response
/// translation.
///
/// Routing errors (404/405) are expected and frequent; they translate
/// directly to status responses without being reported. Everything else is
/// reported through the exception handler before rendering.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No route matches the path under any method.
    #[error("no route matches the request path")]
    NotFound,

    /// The path is known under other methods only.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// The methods that would have matched.
        allowed: Vec<Method>,
    },

    /// A required handler parameter has no route variable and no default.
    #[error("missing required handler argument `{name}`")]
    MissingArgument {
        /// The parameter name.
        name: String,
    },

    /// A service identifier the container does not know.
    #[error("unknown service `{0}`")]
    UnknownService(String),

    /// The container knows the service under a different type.
    #[error("service `{0}` is registered with a different type")]
    ServiceType(String),

    /// A controller name the container does not know.
    #[error("unknown controller `{0}`")]
    UnknownController(String),

    /// A controller that does not expose the requested action.
    #[error("controller `{controller}` has no action `{action}`")]
    UnknownAction {
        /// The controller name.
        controller: String,
        /// The missing action.
        action: String,
    },

    /// A middleware identifier the registry does not know.
    #[error("unknown middleware `{0}`")]
    UnknownMiddleware(String),

    /// A handler reference string that is not `Controller@action`.
    #[error("malformed handler reference `{0}`")]
    BadHandler(String),

    /// An application failure surfaced by a handler.
    #[error(transparent)]
    App(#[from] anyhow::Error),

    /// A handler or middleware panicked; the unwind was caught at the
    /// pipeline boundary.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl CoreError {
    /// The HTTP status this error translates to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is a routing-layer error, translated without reporting.
    #[must_use]
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::NotFound | Self::MethodNotAllowed { .. })
    }
}
