// Dynamic wires: server-side adapters that forward to remote callbacks

use crate::domain::value::CallValue;
use crate::error::InvocationFault;
use crate::port::CallbackSink;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Correlation id linking a client callback handle to a server slot
pub type CorrelationId = Uuid;

/// Client-side callback handle as received from the transport.
#[derive(Clone)]
pub struct DelegateInterceptor {
    handle: Uuid,
    sink: Arc<dyn CallbackSink>,
}

impl DelegateInterceptor {
    pub fn new(handle: Uuid, sink: Arc<dyn CallbackSink>) -> Self {
        Self { handle, sink }
    }

    pub fn handle(&self) -> Uuid {
        self.handle
    }
}

impl fmt::Debug for DelegateInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateInterceptor")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Forwards a server-side event or delegate invocation to the remote caller.
///
/// Each wire has its own id, which is what event slots use to detach it.
#[derive(Clone, Debug)]
pub struct DynamicWire {
    id: Uuid,
    member: Option<String>,
    interceptor: DelegateInterceptor,
}

impl DynamicWire {
    /// Wire for a named event or delegate property.
    pub fn for_member(member: impl Into<String>, interceptor: DelegateInterceptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            member: Some(member.into()),
            interceptor,
        }
    }

    /// Wire for a delegate passed as a method argument.
    pub fn for_parameter(interceptor: DelegateInterceptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            member: None,
            interceptor,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn interceptor(&self) -> &DelegateInterceptor {
        &self.interceptor
    }

    /// Deliver the invocation to the remote handler.
    pub fn invoke(&self, args: Vec<CallValue>) -> Result<CallValue, InvocationFault> {
        self.interceptor
            .sink
            .deliver(self.interceptor.handle, self.member(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::callback_sink::mocks::RecordingCallbackSink;
    use serde_json::json;

    #[test]
    fn test_wire_forwards_to_sink_with_member() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let handle = Uuid::new_v4();
        let wire = DynamicWire::for_member("Changed", DelegateInterceptor::new(handle, sink.clone()));

        wire.invoke(vec![CallValue::data(json!("x"))]).unwrap();

        let deliveries = sink.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].handle, handle);
        assert_eq!(deliveries[0].member.as_deref(), Some("Changed"));
    }

    #[test]
    fn test_each_wire_gets_own_id() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let interceptor = DelegateInterceptor::new(Uuid::new_v4(), sink);
        let a = DynamicWire::for_parameter(interceptor.clone());
        let b = DynamicWire::for_parameter(interceptor);
        assert_ne!(a.id(), b.id());
        assert!(a.member().is_none());
    }
}
