//! Compiled route table for the mon dispatch pipeline.
//!
//! This crate maps `(method, path)` pairs to registered handlers:
//!
//! - **Patterns** ([`pattern`]): literal segments, `{name}` captures,
//!   `{name:regex}` constraints, and an optional trailing `[...]` group,
//!   compiled once into anchored regexes at registration time.
//! - **Table** ([`table`]): per-method exact-path maps for static routes and
//!   registration-ordered regex scans for parametric routes. Static paths
//!   always win over parametric overlaps; the first-registered parametric
//!   route wins on ambiguity.
//! - **Groups**: stack-based scoped registration contexts carrying a path
//!   prefix and middleware list, restored even if the builder panics.
//! - **Named routes**: a process-wide unique name index supporting reverse
//!   URL building.
//! - **Route data** ([`data`]): serializable route metadata for external
//!   tooling that shows, caches, or rebuilds the table.
//!
//! The table is generic over the handler payload `H`; the dispatch core
//! instantiates it with its handler reference type.

pub mod data;
pub mod pattern;
pub mod table;

pub use data::{Describe, RouteData};
pub use pattern::Pattern;
pub use table::{MatchResult, Route, RouteId, Router};

/// Errors produced during route registration and reverse URL building.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A path pattern failed to compile.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Why compilation failed.
        reason: String,
    },

    /// Two static routes share an identical path for the same method.
    #[error("duplicate static route {method} {path}")]
    DuplicateRoute {
        /// The HTTP method.
        method: http::Method,
        /// The conflicting path.
        path: String,
    },

    /// A route name was registered twice.
    #[error("route name `{0}` is already registered")]
    DuplicateName(String),

    /// A named route was looked up before registration.
    #[error("no route named `{0}`")]
    UnknownName(String),

    /// Reverse URL building is missing a required variable.
    #[error("missing variable `{var}` while building URL for `{pattern}`")]
    MissingVar {
        /// The route pattern being filled.
        pattern: String,
        /// The absent variable.
        var: String,
    },

    /// Rebuilding a table from persisted data met a handler identifier the
    /// resolver does not know.
    #[error("no handler registered for `{0}`")]
    UnknownHandler(String),
}
