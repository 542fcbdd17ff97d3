//! Request sessions and their persistence.
//!
//! A handler attaches a [`Session`] to the context under [`SESSION_ATTRIBUTE`]. When
//! the request completes, a session that is new or was modified is handed to the
//! router's [`SessionStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use indexmap::IndexMap;

use crate::context::error::ContextError;

/// Attribute key the context looks for at teardown.
pub const SESSION_ATTRIBUTE: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    data: IndexMap<String, String>,
    new: bool,
    modified: bool,
}

impl Session {
    /// A session that has never been stored.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: IndexMap::new(),
            new: true,
            modified: false,
        }
    }

    /// A session loaded from a store.
    pub fn restore(id: impl Into<String>, data: IndexMap<String, String>) -> Self {
        Self {
            id: id.into(),
            data,
            new: false,
            modified: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
        self.modified = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.data.shift_remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn data(&self) -> &IndexMap<String, String> {
        &self.data
    }

    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Whether teardown has anything to persist.
    pub fn needs_save(&self) -> bool {
        self.new || self.modified
    }
}

/// Where sessions live between requests.
pub trait SessionStore: Send + Sync {
    fn find(&self, id: &str) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<(), ContextError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, IndexMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn find(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.lock().ok()?;
        sessions
            .get(id)
            .map(|data| Session::restore(id, data.clone()))
    }

    fn save(&self, session: &Session) -> Result<(), ContextError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ContextError::Handler("session store lock poisoned".to_string()))?;
        sessions.insert(session.id().to_string(), session.data().clone());
        Ok(())
    }
}
