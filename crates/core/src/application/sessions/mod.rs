// Session Lifecycle Manager

mod sweeper;

pub use sweeper::SessionSweeper;

use crate::domain::{CallContext, Identity, ServerSession, SessionId, SessionVariables};
use crate::error::{DispatchError, Result};
use crate::port::{
    AuthRequest, AuthenticationProvider, Credentials, LoginEvent, LoginEventType, SessionStore,
    TimeProvider,
};
use crate::application::observers::CallObservers;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Authenticates callers and owns the live sessions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    authenticator: Arc<dyn AuthenticationProvider>,
    clock: Arc<dyn TimeProvider>,
    observers: Arc<CallObservers>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        authenticator: Arc<dyn AuthenticationProvider>,
        clock: Arc<dyn TimeProvider>,
        observers: Arc<CallObservers>,
    ) -> Self {
        Self {
            store,
            authenticator,
            clock,
            observers,
        }
    }

    /// Maximum idle age of a session in minutes
    pub fn session_age_limit(&self) -> u32 {
        self.store.max_age_minutes()
    }

    pub fn exists(&self, session_id: SessionId) -> bool {
        self.store.exists(session_id)
    }

    pub fn get(&self, session_id: SessionId) -> Option<Arc<ServerSession>> {
        self.store.get(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.store.session_ids().len()
    }

    /// Authenticate and open a session under the client-chosen id.
    ///
    /// Logging on again with a live id is a no-op returning the existing
    /// session.
    pub async fn logon(
        &self,
        session_id: SessionId,
        credentials: Credentials,
        ctx: &CallContext,
    ) -> Result<Arc<ServerSession>> {
        if session_id.is_nil() {
            return Err(DispatchError::Argument(
                "an empty session id is not allowed".to_string(),
            ));
        }
        if let Some(existing) = self.store.get(session_id) {
            debug!(session_id = %session_id, "Logon for existing session ignored");
            return Ok(existing);
        }

        let client_address = ctx.client_ip_string();
        let response = self
            .authenticator
            .authenticate(AuthRequest {
                credentials,
                client_address: client_address.clone(),
            })
            .await;

        if !response.success {
            warn!(
                session_id = %session_id,
                client_address = %client_address,
                reason = response.error_message.as_deref().unwrap_or(""),
                "Authentication failed"
            );
            return Err(response.error.unwrap_or_else(|| {
                DispatchError::Security(
                    response
                        .error_message
                        .unwrap_or_else(|| "authentication failed".to_string()),
                )
            }));
        }

        let identity = response.identity.unwrap_or_else(Identity::anonymous);
        let now = self.clock.now();
        let session = Arc::new(ServerSession::new(
            session_id,
            identity,
            SessionVariables::new(&self.store, session_id),
            now,
        ));
        session.activate()?;
        session.set_client_address(client_address.clone());

        if !self.store.store(Arc::clone(&session)) {
            // A concurrent logon with the same id got there first
            return self
                .store
                .get(session_id)
                .ok_or(DispatchError::InvalidSession(session_id));
        }

        info!(
            session_id = %session_id,
            identity = %session.identity().name,
            client_address = %client_address,
            "Logged on"
        );
        self.observers.logged_on(&LoginEvent {
            event_type: LoginEventType::Logon,
            identity: session.identity().clone(),
            client_address,
            timestamp: now,
        });
        Ok(session)
    }

    /// Extend the caller's session; returns the session age limit.
    ///
    /// A session already idle past the age limit is expired instead of
    /// renewed.
    pub fn renew_session(&self, ctx: &CallContext) -> Result<u32> {
        let data = ctx
            .data
            .as_ref()
            .ok_or_else(|| DispatchError::Security("call context data missing".to_string()))?;
        let session_id = data.session_id.unwrap_or_else(SessionId::nil);
        let session = self
            .store
            .get(session_id)
            .ok_or(DispatchError::InvalidSession(session_id))?;

        let now = self.clock.now();
        if session.is_expired_at(now, self.session_age_limit()) {
            self.expire(&session);
            return Err(DispatchError::InvalidSession(session_id));
        }

        session.touch(now);
        debug!(session_id = %session_id, "Session renewed");
        Ok(self.session_age_limit())
    }

    /// Close a session. Unknown ids are ignored.
    pub fn logoff(&self, session_id: SessionId, ctx: &CallContext) {
        let Some(session) = self.store.remove(session_id) else {
            return;
        };
        if let Err(e) = session.log_off() {
            debug!(session_id = %session_id, error = %e, "Session was not active at logoff");
        }

        let client_address = ctx.client_ip_string();
        info!(
            session_id = %session_id,
            identity = %session.identity().name,
            client_address = %client_address,
            "Logged off"
        );
        self.observers.logged_off(&LoginEvent {
            event_type: LoginEventType::Logoff,
            identity: session.identity().clone(),
            client_address,
            timestamp: session.timestamp(),
        });
    }

    /// Resolve the caller's session for one invocation.
    ///
    /// Touches the timestamp and records the caller's address. A session
    /// past its age limit is expired on the spot.
    pub fn validate(&self, session_id: SessionId, ctx: &CallContext) -> Result<Arc<ServerSession>> {
        if session_id.is_nil() {
            return Err(DispatchError::InvalidSession(session_id));
        }
        let session = self
            .store
            .get(session_id)
            .ok_or(DispatchError::InvalidSession(session_id))?;

        let now = self.clock.now();
        if session.is_expired_at(now, self.session_age_limit()) {
            self.expire(&session);
            return Err(DispatchError::InvalidSession(session_id));
        }

        session.touch(now);
        if let Some(address) = ctx.client_address {
            session.set_client_address(address.to_string());
        }
        Ok(session)
    }

    /// Remove every session idle past the age limit.
    pub fn expire_stale_sessions(&self) -> Vec<SessionId> {
        let now = self.clock.now();
        let max_age = self.session_age_limit();
        let mut expired = Vec::new();

        for session_id in self.store.session_ids() {
            let Some(session) = self.store.get(session_id) else {
                continue;
            };
            if session.is_expired_at(now, max_age) {
                self.expire(&session);
                expired.push(session_id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired stale sessions");
        }
        expired
    }

    fn expire(&self, session: &ServerSession) {
        self.store.remove(session.id());
        if let Err(e) = session.expire() {
            debug!(session_id = %session.id(), error = %e, "Session already closed");
        }
        debug!(session_id = %session.id(), "Session expired");
    }
}
