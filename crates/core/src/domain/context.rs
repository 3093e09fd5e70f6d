// Ambient call context and per-call scope

use crate::domain::session::{ServerSession, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Distributed transaction handle propagated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHandle(String);

impl TransactionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Out-of-band data traveling alongside a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalCallContextData {
    pub session_id: Option<SessionId>,
    pub transaction: Option<TransactionHandle>,
}

/// What the transport knows about the caller.
///
/// `data == None` means the caller sent no context block at all, which the
/// dispatcher treats as a security violation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub data: Option<LogicalCallContextData>,
    pub client_address: Option<IpAddr>,
}

impl CallContext {
    /// Context with no data block.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_session(session_id: SessionId) -> Self {
        Self {
            data: Some(LogicalCallContextData {
                session_id: Some(session_id),
                transaction: None,
            }),
            client_address: None,
        }
    }

    pub fn with_transaction(mut self, transaction: TransactionHandle) -> Self {
        self.data.get_or_insert_with(Default::default).transaction = Some(transaction);
        self
    }

    pub fn with_client_address(mut self, address: IpAddr) -> Self {
        self.client_address = Some(address);
        self
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.data.as_ref().and_then(|d| d.session_id)
    }

    pub fn transaction(&self) -> Option<&TransactionHandle> {
        self.data.as_ref().and_then(|d| d.transaction.as_ref())
    }

    /// Caller address as stored on the session; empty when unknown.
    pub fn client_ip_string(&self) -> String {
        self.client_address
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }
}

/// Per-call scope handed to method handlers.
///
/// Carries the validated session of the caller for the duration of one
/// invocation.
#[derive(Debug, Clone)]
pub struct CallScope {
    pub tracking_id: Uuid,
    pub session: Arc<ServerSession>,
}

impl CallScope {
    pub fn new(tracking_id: Uuid, session: Arc<ServerSession>) -> Self {
        Self {
            tracking_id,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_builder_fills_data_block() {
        let id = SessionId::new_v4();
        let ctx = CallContext::for_session(id)
            .with_transaction(TransactionHandle::new("tx-1"))
            .with_client_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));

        assert_eq!(ctx.session_id(), Some(id));
        assert_eq!(ctx.transaction().map(TransactionHandle::as_str), Some("tx-1"));
        assert_eq!(ctx.client_ip_string(), "10.0.0.7");
    }

    #[test]
    fn test_transaction_on_empty_context_creates_block_without_session() {
        let ctx = CallContext::empty().with_transaction(TransactionHandle::new("tx"));
        assert!(ctx.data.is_some());
        assert_eq!(ctx.session_id(), None);
        assert_eq!(CallContext::empty().client_ip_string(), "");
    }
}
