// Observer list fanning out dispatcher notifications

use crate::domain::InvocationRequest;
use crate::port::{AfterInvokeArgs, CallObserver, InvokeCanceledArgs, InvokeDecision, LoginEvent};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
pub struct CallObservers {
    observers: RwLock<Vec<Arc<dyn CallObserver>>>,
}

impl CallObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn CallObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn is_empty(&self) -> bool {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    // Hooks run on a snapshot so an observer may register another one.
    fn snapshot(&self) -> Vec<Arc<dyn CallObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run before-invoke observers in registration order; the first veto wins.
    pub fn before_invoke(&self, request: &mut InvocationRequest) -> InvokeDecision {
        for observer in self.snapshot() {
            if let InvokeDecision::Cancel(reason) = observer.before_invoke(request) {
                return InvokeDecision::Cancel(reason);
            }
        }
        InvokeDecision::Proceed
    }

    pub fn after_invoke(&self, args: &AfterInvokeArgs<'_>) {
        for observer in self.snapshot() {
            observer.after_invoke(args);
        }
    }

    pub fn invoke_canceled(&self, args: &InvokeCanceledArgs<'_>) {
        for observer in self.snapshot() {
            observer.invoke_canceled(args);
        }
    }

    pub fn logged_on(&self, event: &LoginEvent) {
        for observer in self.snapshot() {
            observer.logged_on(event);
        }
    }

    pub fn logged_off(&self, event: &LoginEvent) {
        for observer in self.snapshot() {
            observer.logged_off(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::observer::mocks::RecordingObserver;
    use uuid::Uuid;

    #[test]
    fn test_first_cancel_stops_the_chain() {
        let observers = CallObservers::new();
        let first = Arc::new(RecordingObserver::canceling(Some("maintenance")));
        let second = Arc::new(RecordingObserver::new());
        observers.add(first.clone());
        observers.add(second.clone());

        let mut request = InvocationRequest::new(Uuid::new_v4(), "ICalc", "Add");
        assert_eq!(
            observers.before_invoke(&mut request),
            InvokeDecision::Cancel(Some("maintenance".to_string()))
        );
        assert_eq!(first.before_count(), 1);
        assert_eq!(second.before_count(), 0);
    }

    #[test]
    fn test_observer_may_rewrite_request() {
        struct Redirect;
        impl CallObserver for Redirect {
            fn before_invoke(&self, request: &mut InvocationRequest) -> InvokeDecision {
                request.method_name = "AddChecked".to_string();
                InvokeDecision::Proceed
            }
        }

        let observers = CallObservers::new();
        assert!(observers.is_empty());
        observers.add(Arc::new(Redirect));

        let mut request = InvocationRequest::new(Uuid::new_v4(), "ICalc", "Add");
        assert_eq!(observers.before_invoke(&mut request), InvokeDecision::Proceed);
        assert_eq!(request.method_name, "AddChecked");
    }
}
