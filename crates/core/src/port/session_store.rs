// Session Store Port

use crate::domain::{ServerSession, SessionId};
use std::sync::Arc;

/// Repository of live sessions and their variables.
///
/// Calls are short and never block on I/O in the shipped adapters, so the
/// port is synchronous.
pub trait SessionStore: Send + Sync {
    fn exists(&self, session_id: SessionId) -> bool;

    fn get(&self, session_id: SessionId) -> Option<Arc<ServerSession>>;

    /// Store a session; returns false if the id was already present
    /// (the existing session is kept).
    fn store(&self, session: Arc<ServerSession>) -> bool;

    /// Remove and return the session, if any
    fn remove(&self, session_id: SessionId) -> Option<Arc<ServerSession>>;

    fn session_ids(&self) -> Vec<SessionId>;

    /// Maximum idle age before a session expires (minutes)
    fn max_age_minutes(&self) -> u32;

    fn get_variable(&self, session_id: SessionId, name: &str) -> Option<serde_json::Value>;

    fn set_variable(&self, session_id: SessionId, name: &str, value: serde_json::Value);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Plain map-backed store
    pub struct MapSessionStore {
        sessions: Mutex<HashMap<SessionId, Arc<ServerSession>>>,
        variables: Mutex<HashMap<(SessionId, String), serde_json::Value>>,
        max_age_minutes: u32,
    }

    impl MapSessionStore {
        pub fn new(max_age_minutes: u32) -> Self {
            Self {
                sessions: Mutex::new(HashMap::new()),
                variables: Mutex::new(HashMap::new()),
                max_age_minutes,
            }
        }
    }

    impl SessionStore for MapSessionStore {
        fn exists(&self, session_id: SessionId) -> bool {
            self.sessions.lock().unwrap().contains_key(&session_id)
        }

        fn get(&self, session_id: SessionId) -> Option<Arc<ServerSession>> {
            self.sessions.lock().unwrap().get(&session_id).cloned()
        }

        fn store(&self, session: Arc<ServerSession>) -> bool {
            let mut sessions = self.sessions.lock().unwrap();
            if sessions.contains_key(&session.id()) {
                return false;
            }
            sessions.insert(session.id(), session);
            true
        }

        fn remove(&self, session_id: SessionId) -> Option<Arc<ServerSession>> {
            self.variables
                .lock()
                .unwrap()
                .retain(|(id, _), _| *id != session_id);
            self.sessions.lock().unwrap().remove(&session_id)
        }

        fn session_ids(&self) -> Vec<SessionId> {
            self.sessions.lock().unwrap().keys().copied().collect()
        }

        fn max_age_minutes(&self) -> u32 {
            self.max_age_minutes
        }

        fn get_variable(&self, session_id: SessionId, name: &str) -> Option<serde_json::Value> {
            self.variables
                .lock()
                .unwrap()
                .get(&(session_id, name.to_string()))
                .cloned()
        }

        fn set_variable(&self, session_id: SessionId, name: &str, value: serde_json::Value) {
            self.variables
                .lock()
                .unwrap()
                .insert((session_id, name.to_string()), value);
        }
    }
}
