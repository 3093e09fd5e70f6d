// In-memory SessionStore Implementation

use remora_core::domain::{ServerSession, SessionId};
use remora_core::port::SessionStore;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

pub const DEFAULT_SESSION_AGE_MINUTES: u32 = 30;

#[derive(Default)]
struct Entries {
    sessions: HashMap<SessionId, Arc<ServerSession>>,
    variables: HashMap<SessionId, HashMap<String, serde_json::Value>>,
}

/// Process-local session store. Variables are dropped with their session.
pub struct InMemorySessionStore {
    entries: RwLock<Entries>,
    max_age_minutes: u32,
}

impl InMemorySessionStore {
    pub fn new(max_age_minutes: u32) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_age_minutes,
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_AGE_MINUTES)
    }
}

impl SessionStore for InMemorySessionStore {
    fn exists(&self, session_id: SessionId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .contains_key(&session_id)
    }

    fn get(&self, session_id: SessionId) -> Option<Arc<ServerSession>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .get(&session_id)
            .cloned()
    }

    fn store(&self, session: Arc<ServerSession>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.sessions.contains_key(&session.id()) {
            debug!(session_id = %session.id(), "Session already stored, keeping existing");
            return false;
        }
        entries.sessions.insert(session.id(), session);
        true
    }

    fn remove(&self, session_id: SessionId) -> Option<Arc<ServerSession>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.variables.remove(&session_id);
        entries.sessions.remove(&session_id)
    }

    fn session_ids(&self) -> Vec<SessionId> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .keys()
            .copied()
            .collect()
    }

    fn max_age_minutes(&self) -> u32 {
        self.max_age_minutes
    }

    fn get_variable(&self, session_id: SessionId, name: &str) -> Option<serde_json::Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .variables
            .get(&session_id)
            .and_then(|vars| vars.get(name))
            .cloned()
    }

    // Writes for sessions that are not stored are ignored.
    fn set_variable(&self, session_id: SessionId, name: &str, value: serde_json::Value) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.sessions.contains_key(&session_id) {
            return;
        }
        entries
            .variables
            .entry(session_id)
            .or_default()
            .insert(name.to_string(), value);
    }
}
