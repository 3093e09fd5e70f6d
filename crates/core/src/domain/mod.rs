// Domain Layer - Call envelopes, components, sessions and wiring records

pub mod component;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod request;
pub mod session;
pub mod types;
pub mod value;
pub mod wire;

// Re-exports
pub use component::{
    ActivationType, CallbackSlots, ComponentInfo, ComponentInstance, ComponentRegistration,
    InterfaceDescriptor, MethodCall, MethodDescriptor, MethodFuture, MethodHandler, MethodKey,
    WiringTable,
};
pub use context::{CallContext, CallScope, LogicalCallContextData, TransactionHandle};
pub use error::DomainError;
pub use interceptor::{
    CallInterceptor, CallSignature, InterceptedCall, InterceptionHandler, MemberKind,
};
pub use request::{DelegateCorrelationInfo, InvocationRequest};
pub use session::{Identity, ServerSession, SessionId, SessionState, SessionVariables};
pub use types::TypeName;
pub use value::{CallValue, CustomSerializationContainer, TypedObject};
pub use wire::{CorrelationId, DelegateInterceptor, DynamicWire};
