// In-memory TransactionCoordinator Implementation

use async_trait::async_trait;
use remora_core::domain::TransactionHandle;
use remora_core::error::{DispatchError, Result};
use remora_core::port::{TransactionCoordinator, TransactionScope};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Bookkeeping for one transaction while it has outstanding participants.
///
/// The ledger is evicted when its last participant commits or rolls back,
/// so a rolled-back handle refuses new joins only while earlier
/// participants are still running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLedger {
    pub joined: usize,
    pub committed: usize,
    pub rolled_back: usize,
    /// Set once any participant rolls back; later joins are refused
    pub aborted: bool,
    outstanding: usize,
}

impl TransactionLedger {
    /// Participants that have joined but not yet completed
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

/// Completed participant outcomes across every transaction seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionTotals {
    pub joined: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

#[derive(Default)]
struct CoordinatorState {
    ledgers: HashMap<TransactionHandle, TransactionLedger>,
    totals: TransactionTotals,
}

type SharedState = Arc<Mutex<CoordinatorState>>;

/// Coordinator keeping one ledger per in-flight transaction handle.
#[derive(Default)]
pub struct InMemoryTransactionCoordinator {
    state: SharedState,
}

impl InMemoryTransactionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger of a transaction that still has outstanding participants
    pub fn ledger(&self, handle: &TransactionHandle) -> Option<TransactionLedger> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ledgers
            .get(handle)
            .cloned()
    }

    /// Number of transactions with outstanding participants
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ledgers
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn totals(&self) -> TransactionTotals {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).totals
    }
}

#[async_trait]
impl TransactionCoordinator for InMemoryTransactionCoordinator {
    async fn join(&self, handle: &TransactionHandle) -> Result<Box<dyn TransactionScope>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.ledgers.get(handle).is_some_and(|ledger| ledger.aborted) {
            return Err(DispatchError::Transaction(format!(
                "transaction '{handle}' was rolled back"
            )));
        }

        let ledger = state.ledgers.entry(handle.clone()).or_default();
        ledger.joined += 1;
        ledger.outstanding += 1;
        let participants = ledger.outstanding;
        state.totals.joined += 1;
        debug!(transaction = %handle, participants, "Joined transaction");

        Ok(Box::new(InMemoryScope {
            handle: handle.clone(),
            state: self.state.clone(),
            completed: false,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Committed,
    RolledBack,
}

struct InMemoryScope {
    handle: TransactionHandle,
    state: SharedState,
    completed: bool,
}

impl InMemoryScope {
    /// Record this participant's outcome and evict the ledger once no
    /// participant is outstanding. Returns whether the transaction was
    /// already aborted.
    fn complete(&mut self, outcome: Outcome) -> bool {
        self.completed = true;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let CoordinatorState { ledgers, totals } = &mut *state;
        let Some(ledger) = ledgers.get_mut(&self.handle) else {
            return false;
        };

        let was_aborted = ledger.aborted;
        let committed = outcome == Outcome::Committed && !was_aborted;
        if committed {
            ledger.committed += 1;
            totals.committed += 1;
        } else {
            ledger.rolled_back += 1;
            ledger.aborted = true;
            totals.rolled_back += 1;
        }

        ledger.outstanding = ledger.outstanding.saturating_sub(1);
        if ledger.outstanding == 0 {
            ledgers.remove(&self.handle);
            debug!(transaction = %self.handle, "Transaction finished");
        }
        was_aborted
    }
}

#[async_trait]
impl TransactionScope for InMemoryScope {
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut scope = self;
        if scope.complete(Outcome::Committed) {
            return Err(DispatchError::Transaction(format!(
                "cannot commit '{}': already rolled back",
                scope.handle
            )));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut scope = self;
        scope.complete(Outcome::RolledBack);
        warn!(transaction = %scope.handle, "Transaction rolled back");
        Ok(())
    }
}

impl Drop for InMemoryScope {
    fn drop(&mut self) {
        if !self.completed {
            warn!(transaction = %self.handle, "Transaction scope dropped without completion");
            self.complete(Outcome::RolledBack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_is_recorded_and_ledger_evicted() {
        let coordinator = InMemoryTransactionCoordinator::new();
        let handle = TransactionHandle::new("T1");

        let scope = coordinator.join(&handle).await.unwrap();
        let ledger = coordinator.ledger(&handle).unwrap();
        assert_eq!(ledger.joined, 1);
        assert_eq!(ledger.outstanding(), 1);

        scope.commit().await.unwrap();

        assert!(coordinator.ledger(&handle).is_none());
        assert!(coordinator.is_empty());
        assert_eq!(
            coordinator.totals(),
            TransactionTotals {
                joined: 1,
                committed: 1,
                rolled_back: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_rollback_dooms_transaction_while_participants_remain() {
        let coordinator = InMemoryTransactionCoordinator::new();
        let handle = TransactionHandle::new("T2");

        let first = coordinator.join(&handle).await.unwrap();
        let second = coordinator.join(&handle).await.unwrap();
        first.rollback().await.unwrap();

        assert!(coordinator.join(&handle).await.is_err());
        let ledger = coordinator.ledger(&handle).unwrap();
        assert_eq!(ledger.joined, 2);
        assert_eq!(ledger.rolled_back, 1);
        assert!(ledger.aborted);

        assert!(second.commit().await.is_err());
        assert_eq!(coordinator.len(), 0);
        assert_eq!(coordinator.totals().rolled_back, 2);
        assert!(coordinator.ledger(&TransactionHandle::new("T3")).is_none());
    }

    #[tokio::test]
    async fn test_many_transactions_leave_no_ledgers_behind() {
        let coordinator = InMemoryTransactionCoordinator::new();
        for n in 0..100 {
            let handle = TransactionHandle::new(format!("T-{n}"));
            let scope = coordinator.join(&handle).await.unwrap();
            if n % 2 == 0 {
                scope.commit().await.unwrap();
            } else {
                scope.rollback().await.unwrap();
            }
        }

        assert!(coordinator.is_empty());
        assert_eq!(coordinator.totals().committed, 50);
        assert_eq!(coordinator.totals().rolled_back, 50);
    }

    #[tokio::test]
    async fn test_dropped_scope_counts_as_rollback() {
        let coordinator = InMemoryTransactionCoordinator::new();
        let handle = TransactionHandle::new("T4");

        let scope = coordinator.join(&handle).await.unwrap();
        drop(scope);

        assert!(coordinator.is_empty());
        assert_eq!(coordinator.totals().rolled_back, 1);
    }
}
