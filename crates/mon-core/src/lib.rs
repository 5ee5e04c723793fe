//! The mon dispatch pipeline.
//!
//! Everything between a matched route and a wire-ready response lives here:
//!
//! - [`container`]: shared services and controller factories.
//! - [`handler`] / [`invoker`]: the closed handler set and binding-plan
//!   driven invocation with numeric route-variable coercion.
//! - [`pipeline`]: onion middleware composition threading a [`Flow`] value
//!   so short-circuits skip post-processing without unwinding.
//! - [`middleware`]: the named middleware singleton registry.
//! - [`exception`]: tiered error-to-response translation behind a pluggable
//!   handler contract, with a panic-proof fallback.
//! - [`assemble`]: normalization of raw handler replies.
//! - [`cache`]: the bounded composed-callable cache with drop-all eviction.
//! - [`dispatch`]: the [`Dispatcher`] orchestrating all of the above.
//! - [`session`]: the minimal session-store contract the core depends on.
//!
//! The dispatcher and its collaborators are built once at startup and shared
//! read-only across requests; per-request state travels by parameter, never
//! in process-wide slots.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod exception;
pub mod handler;
pub mod invoker;
pub mod middleware;
pub mod pipeline;
pub mod session;

pub use cache::{CachedCallback, CallbackCache};
pub use config::CoreConfig;
pub use container::Container;
pub use dispatch::{Dispatcher, path_is_safe};
pub use error::CoreError;
pub use exception::{DefaultExceptionHandler, ExceptionHandler, translate};
pub use handler::{Controller, Handler, HandlerRef};
pub use invoker::{Invocation, Invoker, ParamSource, ParamSpec, VarValue};
pub use middleware::MiddlewareRegistry;
pub use pipeline::{Composed, Flow, Middleware, Next, compose};
pub use session::{MemorySessionStore, SessionStore};
