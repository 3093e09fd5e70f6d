// Server Session Domain Model

use crate::domain::error::{DomainError, Result};
use crate::port::SessionStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use uuid::Uuid;

/// Session id chosen by the client at logon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The empty sentinel; never a valid session.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Authenticated caller identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub authentication_type: String,
    pub is_authenticated: bool,
}

impl Identity {
    pub fn authenticated(name: impl Into<String>, authentication_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authentication_type: authentication_type.into(),
            is_authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            authentication_type: String::new(),
            is_authenticated: false,
        }
    }
}

/// Session State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Unauthenticated,
    Active,
    Expired,
    LoggedOff,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "UNAUTHENTICATED"),
            SessionState::Active => write!(f, "ACTIVE"),
            SessionState::Expired => write!(f, "EXPIRED"),
            SessionState::LoggedOff => write!(f, "LOGGED_OFF"),
        }
    }
}

/// Session-scoped variables, backed by the session store.
#[derive(Clone)]
pub struct SessionVariables {
    store: Weak<dyn SessionStore>,
    session_id: SessionId,
}

impl SessionVariables {
    pub fn new(store: &Arc<dyn SessionStore>, session_id: SessionId) -> Self {
        Self {
            store: Arc::downgrade(store),
            session_id,
        }
    }

    /// Returns `None` for unknown names or once the store is gone.
    pub fn get(&self, name: &str) -> Option<serde_json::Value> {
        self.store
            .upgrade()
            .and_then(|store| store.get_variable(self.session_id, name))
    }

    pub fn set(&self, name: &str, value: serde_json::Value) {
        if let Some(store) = self.store.upgrade() {
            store.set_variable(self.session_id, name, value);
        }
    }
}

impl fmt::Debug for SessionVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionVariables")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Authenticated caller context.
///
/// Shared between concurrent calls of the same client, so the mutable parts
/// (state, timestamp, address) sit behind their own locks.
#[derive(Debug)]
pub struct ServerSession {
    id: SessionId,
    identity: Identity,
    state: Mutex<SessionState>,
    timestamp: Mutex<DateTime<Utc>>,
    client_address: Mutex<String>,
    variables: SessionVariables,
}

impl ServerSession {
    /// Create a session in the Unauthenticated state
    pub fn new(
        id: SessionId,
        identity: Identity,
        variables: SessionVariables,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            identity,
            state: Mutex::new(SessionState::Unauthenticated),
            timestamp: Mutex::new(now),
            client_address: Mutex::new(String::new()),
            variables,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn variables(&self) -> &SessionVariables {
        &self.variables
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transition to Active after successful authentication
    pub fn activate(&self) -> Result<()> {
        self.transition(SessionState::Unauthenticated, SessionState::Active)
    }

    /// Transition to Expired when the age limit is exceeded
    pub fn expire(&self) -> Result<()> {
        self.transition(SessionState::Active, SessionState::Expired)
    }

    /// Transition to LoggedOff on explicit logoff
    pub fn log_off(&self) -> Result<()> {
        self.transition(SessionState::Active, SessionState::LoggedOff)
    }

    fn transition(&self, from: SessionState, to: SessionState) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return Err(DomainError::InvalidStateTransition {
                from: state.to_string(),
                to: to.to_string(),
            });
        }
        *state = to;
        Ok(())
    }

    /// Last activity timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        *self.timestamp.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn touch(&self, now: DateTime<Utc>) {
        *self.timestamp.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn client_address(&self) -> String {
        self.client_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_client_address(&self, address: impl Into<String>) {
        *self
            .client_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = address.into();
    }

    /// True once the session has been idle longer than `max_age_minutes`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, max_age_minutes: u32) -> bool {
        now - self.timestamp() > Duration::minutes(i64::from(max_age_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::session_store::mocks::MapSessionStore;

    fn session(now: DateTime<Utc>) -> (Arc<dyn SessionStore>, ServerSession) {
        let store: Arc<dyn SessionStore> = Arc::new(MapSessionStore::new(20));
        let id = SessionId::new_v4();
        let variables = SessionVariables::new(&store, id);
        (store, ServerSession::new(id, Identity::authenticated("alice", "basic"), variables, now))
    }

    #[test]
    fn test_state_machine_happy_path() {
        let (_store, session) = session(Utc::now());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        session.activate().unwrap();
        assert_eq!(session.state(), SessionState::Active);
        session.log_off().unwrap();
        assert_eq!(session.state(), SessionState::LoggedOff);
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let (_store, session) = session(Utc::now());
        session.activate().unwrap();
        session.expire().unwrap();

        let err = session.log_off().unwrap_err();
        assert!(err.to_string().contains("EXPIRED -> LOGGED_OFF"));
        assert!(session.activate().is_err());
    }

    #[test]
    fn test_expiry_uses_last_activity() {
        let start = Utc::now();
        let (_store, session) = session(start);
        assert!(!session.is_expired_at(start + Duration::minutes(20), 20));
        assert!(session.is_expired_at(start + Duration::minutes(21), 20));

        session.touch(start + Duration::minutes(15));
        assert!(!session.is_expired_at(start + Duration::minutes(30), 20));
    }

    #[test]
    fn test_variables_go_through_store() {
        let (store, session) = session(Utc::now());
        session.variables().set("cart", serde_json::json!([1, 2]));
        assert_eq!(
            session.variables().get("cart"),
            Some(serde_json::json!([1, 2]))
        );

        drop(store);
        assert_eq!(session.variables().get("cart"), None);
    }
}
