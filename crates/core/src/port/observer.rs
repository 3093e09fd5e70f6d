// Call Observer Port
// Hooks fired around invocations and session changes

use crate::domain::{CallValue, Identity, InvocationRequest};
use crate::error::DispatchError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Verdict of a before-invoke observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeDecision {
    Proceed,
    /// Abort the call, optionally with a reason for the caller
    Cancel(Option<String>),
}

#[derive(Debug)]
pub struct AfterInvokeArgs<'a> {
    pub tracking_id: Uuid,
    pub interface_name: &'a str,
    pub method_name: &'a str,
    pub arguments: &'a [CallValue],
    pub return_value: &'a CallValue,
}

#[derive(Debug)]
pub struct InvokeCanceledArgs<'a> {
    pub tracking_id: Uuid,
    pub error: &'a DispatchError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEventType {
    Logon,
    Logoff,
}

#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub event_type: LoginEventType,
    pub identity: Identity,
    pub client_address: String,
    pub timestamp: DateTime<Utc>,
}

/// Observer of dispatcher activity.
///
/// Every hook defaults to a no-op so observers implement only what they
/// need. Hooks run synchronously on the calling task.
pub trait CallObserver: Send + Sync {
    /// May rewrite the request or veto it.
    fn before_invoke(&self, _request: &mut InvocationRequest) -> InvokeDecision {
        InvokeDecision::Proceed
    }

    fn after_invoke(&self, _args: &AfterInvokeArgs<'_>) {}

    fn invoke_canceled(&self, _args: &InvokeCanceledArgs<'_>) {}

    fn logged_on(&self, _event: &LoginEvent) {}

    fn logged_off(&self, _event: &LoginEvent) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Counts every hook and keeps the cancel messages.
    #[derive(Default)]
    pub struct RecordingObserver {
        cancel_with: Mutex<Option<Option<String>>>,
        before: Mutex<Vec<Uuid>>,
        after: Mutex<Vec<Uuid>>,
        canceled: Mutex<Vec<String>>,
        logons: Mutex<Vec<LoginEvent>>,
        logoffs: Mutex<Vec<LoginEvent>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Observer that vetoes every call.
        pub fn canceling(reason: Option<&str>) -> Self {
            let observer = Self::default();
            *observer.cancel_with.lock().unwrap() = Some(reason.map(str::to_string));
            observer
        }

        pub fn before_count(&self) -> usize {
            self.before.lock().unwrap().len()
        }

        pub fn after_count(&self) -> usize {
            self.after.lock().unwrap().len()
        }

        pub fn canceled(&self) -> Vec<String> {
            self.canceled.lock().unwrap().clone()
        }

        pub fn logons(&self) -> Vec<LoginEvent> {
            self.logons.lock().unwrap().clone()
        }

        pub fn logoffs(&self) -> Vec<LoginEvent> {
            self.logoffs.lock().unwrap().clone()
        }
    }

    impl CallObserver for RecordingObserver {
        fn before_invoke(&self, request: &mut InvocationRequest) -> InvokeDecision {
            self.before.lock().unwrap().push(request.tracking_id);
            match self.cancel_with.lock().unwrap().clone() {
                Some(reason) => InvokeDecision::Cancel(reason),
                None => InvokeDecision::Proceed,
            }
        }

        fn after_invoke(&self, args: &AfterInvokeArgs<'_>) {
            self.after.lock().unwrap().push(args.tracking_id);
        }

        fn invoke_canceled(&self, args: &InvokeCanceledArgs<'_>) {
            self.canceled.lock().unwrap().push(args.error.to_string());
        }

        fn logged_on(&self, event: &LoginEvent) {
            self.logons.lock().unwrap().push(event.clone());
        }

        fn logged_off(&self, event: &LoginEvent) {
            self.logoffs.lock().unwrap().push(event.clone());
        }
    }
}
