// Remora Infrastructure - In-memory adapters
// Implements: SessionStore, ComponentActivator, TransactionCoordinator

mod activator;
mod session_store;
mod transaction;

pub use activator::InMemoryActivator;
pub use session_store::InMemorySessionStore;
pub use transaction::{InMemoryTransactionCoordinator, TransactionLedger, TransactionTotals};
