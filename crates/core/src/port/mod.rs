// Port Layer - Interfaces for external collaborators

pub mod activation;
pub mod authentication;
pub mod callback_sink; // Owned by the transport
pub mod observer;
pub mod serialization;
pub mod session_store;
pub mod time_provider; // For deterministic testing
pub mod transaction;

// Re-exports
pub use activation::ComponentActivator;
pub use authentication::{
    AuthRequest, AuthResponse, AuthenticationProvider, Credentials, NullAuthenticationProvider,
};
pub use callback_sink::CallbackSink;
pub use observer::{
    AfterInvokeArgs, CallObserver, InvokeCanceledArgs, InvokeDecision, LoginEvent, LoginEventType,
};
pub use serialization::SerializationHandler;
pub use session_store::SessionStore;
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use transaction::{TransactionCoordinator, TransactionScope};
