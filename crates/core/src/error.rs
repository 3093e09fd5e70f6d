// Central Error Type for the Dispatch Core

use crate::domain::{SessionId, TypeName};
use thiserror::Error;

/// Error surfaced to the remote caller.
///
/// Every variant reaches the caller unchanged; the dispatcher emits a
/// call-canceled notification before returning any of them from `invoke`.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("No component registered for interface '{0}'")]
    ComponentNotFound(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Session '{0}' is invalid. Please log on again.")]
    InvalidSession(SessionId),

    #[error("No serialization handler registered for type '{0}'")]
    SerializationHandlerNotFound(TypeName),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invoke canceled: {0}")]
    InvokeCanceled(String),

    #[error(transparent)]
    Invocation(#[from] InvocationFault),

    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Activation error: {0}")]
    Activation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}

/// Result type alias using DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Business fault raised by an invoked component method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct InvocationFault {
    pub kind: String,
    pub message: String,
}

impl InvocationFault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Fault without a specific kind.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new("InvocationFault", message)
    }
}
