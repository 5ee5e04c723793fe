//! The bounded composed-callable cache.
//!
//! Entries are keyed by `(method, exact path)` and derived purely from
//! immutable route and middleware state, so they can never go stale within
//! a process lifetime. The only eviction is capacity-based: when the table
//! grows past its maximum the whole cache is dropped at once. Coarse, but
//! the rebuild cost is one route resolution per key.

use dashmap::DashMap;
use http::Method;
use tracing::debug;

use crate::pipeline::Composed;

/// One cached entry: the composed callable plus the resolved
/// controller/action names for diagnostics.
#[derive(Clone)]
pub struct CachedCallback {
    /// The composed, ready-to-run callable.
    pub callable: Composed,
    /// The controller name, for controller/action handlers.
    pub controller: Option<String>,
    /// The action name, for controller/action handlers.
    pub action: Option<String>,
}

impl std::fmt::Debug for CachedCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCallback")
            .field("controller", &self.controller)
            .field("action", &self.action)
            .finish()
    }
}

/// Bounded `(method, path)` → composed-callable cache with drop-all
/// eviction.
pub struct CallbackCache {
    entries: DashMap<(Method, String), CachedCallback>,
    max: usize,
}

impl CallbackCache {
    /// Create a cache holding at most `max` entries.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self { entries: DashMap::new(), max }
    }

    /// Look up the entry for an exact `(method, path)` pair.
    #[must_use]
    pub fn get(&self, method: &Method, path: &str) -> Option<CachedCallback> {
        self.entries
            .get(&(method.clone(), path.to_owned()))
            .map(|e| e.value().clone())
    }

    /// Store an entry, dropping the whole cache first if it is full.
    pub fn insert(&self, method: Method, path: String, entry: CachedCallback) {
        if self.entries.len() >= self.max {
            debug!(size = self.entries.len(), "callback cache full, dropping all entries");
            self.entries.clear();
        }
        self.entries.insert((method, path), entry);
    }

    /// The current entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CallbackCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackCache")
            .field("entries", &self.entries.len())
            .field("max", &self.max)
            .finish()
    }
}
