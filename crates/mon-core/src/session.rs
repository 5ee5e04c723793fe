//! The session store contract.
//!
//! Session backends are external collaborators; the core only defines the
//! minimal capability set it needs and ships an in-memory implementation
//! for tests and demo apps.

use std::collections::HashMap;

use dashmap::DashMap;

/// The pluggable session backend contract: per-session key/value access.
pub trait SessionStore: Send + Sync {
    /// Read one key from a session.
    fn get(&self, session_id: &str, key: &str) -> Option<String>;

    /// Write one key into a session.
    fn set(&self, session_id: &str, key: &str, value: String);

    /// Remove one key from a session.
    fn delete(&self, session_id: &str, key: &str);

    /// Drop a whole session.
    fn flush(&self, session_id: &str);
}

/// A `DashMap`-backed in-memory store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Option<String> {
        self.sessions
            .get(session_id)
            .and_then(|session| session.get(key).cloned())
    }

    fn set(&self, session_id: &str, key: &str, value: String) {
        self.sessions
            .entry(session_id.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }

    fn delete(&self, session_id: &str, key: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.remove(key);
        }
    }

    fn flush(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_session_values() {
        let store = MemorySessionStore::new();
        store.set("s1", "user", "ada".to_owned());
        assert_eq!(store.get("s1", "user").as_deref(), Some("ada"));
        assert_eq!(store.get("s2", "user"), None);
    }

    #[test]
    fn test_should_delete_single_key() {
        let store = MemorySessionStore::new();
        store.set("s1", "user", "ada".to_owned());
        store.set("s1", "theme", "dark".to_owned());
        store.delete("s1", "user");
        assert_eq!(store.get("s1", "user"), None);
        assert_eq!(store.get("s1", "theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_should_flush_whole_session() {
        let store = MemorySessionStore::new();
        store.set("s1", "user", "ada".to_owned());
        store.flush("s1");
        assert_eq!(store.get("s1", "user"), None);
    }
}
