// Transaction port for ambient distributed transactions

use crate::domain::TransactionHandle;
use crate::error::Result;
use async_trait::async_trait;

/// Scope joined to a caller's transaction for the duration of one call
#[async_trait]
pub trait TransactionScope: Send {
    /// Commit the scope
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the scope
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens scopes joined to propagated transactions
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    async fn join(&self, handle: &TransactionHandle) -> Result<Box<dyn TransactionScope>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ScopeOutcome {
        Committed(String),
        RolledBack(String),
    }

    /// Coordinator recording how each scope ended
    #[derive(Default)]
    pub struct RecordingCoordinator {
        outcomes: Arc<Mutex<Vec<ScopeOutcome>>>,
        joined: Mutex<usize>,
    }

    impl RecordingCoordinator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn outcomes(&self) -> Vec<ScopeOutcome> {
            self.outcomes.lock().unwrap().clone()
        }

        pub fn joined(&self) -> usize {
            *self.joined.lock().unwrap()
        }
    }

    struct RecordingScope {
        handle: String,
        outcomes: Arc<Mutex<Vec<ScopeOutcome>>>,
    }

    #[async_trait]
    impl TransactionScope for RecordingScope {
        async fn commit(self: Box<Self>) -> Result<()> {
            let RecordingScope { handle, outcomes } = *self;
            outcomes.lock().unwrap().push(ScopeOutcome::Committed(handle));
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            let RecordingScope { handle, outcomes } = *self;
            outcomes.lock().unwrap().push(ScopeOutcome::RolledBack(handle));
            Ok(())
        }
    }

    #[async_trait]
    impl TransactionCoordinator for RecordingCoordinator {
        async fn join(&self, handle: &TransactionHandle) -> Result<Box<dyn TransactionScope>> {
            *self.joined.lock().unwrap() += 1;
            Ok(Box::new(RecordingScope {
                handle: handle.to_string(),
                outcomes: self.outcomes.clone(),
            }))
        }
    }
}
