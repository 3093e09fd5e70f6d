// Callback Sink Port
// Delivers dynamic-wire invocations back to the remote caller

use crate::domain::CallValue;
use crate::error::InvocationFault;
use uuid::Uuid;

pub trait CallbackSink: Send + Sync {
    /// Invoke the client-side handler identified by `handle`.
    ///
    /// `member` is the event or delegate property name, `None` for a
    /// delegate passed as a method argument.
    fn deliver(
        &self,
        handle: Uuid,
        member: Option<&str>,
        args: Vec<CallValue>,
    ) -> Result<CallValue, InvocationFault>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct Delivery {
        pub handle: Uuid,
        pub member: Option<String>,
        pub args: Vec<CallValue>,
    }

    /// Records every delivery and answers with `Unit`.
    #[derive(Default)]
    pub struct RecordingCallbackSink {
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl RecordingCallbackSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn deliveries(&self) -> Vec<Delivery> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    impl CallbackSink for RecordingCallbackSink {
        fn deliver(
            &self,
            handle: Uuid,
            member: Option<&str>,
            args: Vec<CallValue>,
        ) -> Result<CallValue, InvocationFault> {
            self.deliveries.lock().unwrap().push(Delivery {
                handle,
                member: member.map(str::to_string),
                args,
            });
            Ok(CallValue::Unit)
        }
    }
}
