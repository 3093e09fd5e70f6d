// Component Host
// Owns every shared collection the dispatcher works against

use crate::application::interceptors::CallInterceptorCollection;
use crate::application::notification::NotificationService;
use crate::application::observers::CallObservers;
use crate::application::registry::ComponentRegistry;
use crate::application::serialization::SerializationHandling;
use crate::application::sessions::SessionManager;
use crate::domain::{ComponentRegistration, TypeName};
use crate::error::{DispatchError, Result};
use crate::port::{
    AuthenticationProvider, CallObserver, ComponentActivator, NullAuthenticationProvider,
    SerializationHandler, SessionStore, SystemTimeProvider, TimeProvider, TransactionCoordinator,
};
use std::sync::Arc;

pub struct ComponentHost {
    name: String,
    registry: ComponentRegistry,
    serialization: SerializationHandling,
    observers: Arc<CallObservers>,
    interceptors: CallInterceptorCollection,
    notifications: NotificationService,
    sessions: Arc<SessionManager>,
    activator: Arc<dyn ComponentActivator>,
    transactions: Option<Arc<dyn TransactionCoordinator>>,
}

impl ComponentHost {
    pub fn builder(name: impl Into<String>) -> ComponentHostBuilder {
        ComponentHostBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_component(&self, registration: ComponentRegistration) -> Result<()> {
        self.registry.register(registration).map(|_| ())
    }

    pub fn register_serialization_handler(
        &self,
        handled_type: TypeName,
        handler: Arc<dyn SerializationHandler>,
    ) {
        self.serialization.register(handled_type, handler);
    }

    pub fn add_observer(&self, observer: Arc<dyn CallObserver>) {
        self.observers.add(observer);
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn serialization(&self) -> &SerializationHandling {
        &self.serialization
    }

    pub fn observers(&self) -> &CallObservers {
        &self.observers
    }

    pub fn interceptors(&self) -> &CallInterceptorCollection {
        &self.interceptors
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn activator(&self) -> &Arc<dyn ComponentActivator> {
        &self.activator
    }

    pub fn transactions(&self) -> Option<&Arc<dyn TransactionCoordinator>> {
        self.transactions.as_ref()
    }
}

/// Builder for [`ComponentHost`].
///
/// The activator and session store have no sensible default and must be
/// supplied; everything else falls back to a default.
pub struct ComponentHostBuilder {
    name: String,
    activator: Option<Arc<dyn ComponentActivator>>,
    session_store: Option<Arc<dyn SessionStore>>,
    authenticator: Option<Arc<dyn AuthenticationProvider>>,
    clock: Option<Arc<dyn TimeProvider>>,
    transactions: Option<Arc<dyn TransactionCoordinator>>,
    observers: Vec<Arc<dyn CallObserver>>,
    notifications: bool,
}

impl ComponentHostBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activator: None,
            session_store: None,
            authenticator: None,
            clock: None,
            transactions: None,
            observers: Vec::new(),
            notifications: false,
        }
    }

    pub fn activator(mut self, activator: Arc<dyn ComponentActivator>) -> Self {
        self.activator = Some(activator);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn authentication_provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.authenticator = Some(provider);
        self
    }

    pub fn time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn transaction_coordinator(mut self, coordinator: Arc<dyn TransactionCoordinator>) -> Self {
        self.transactions = Some(coordinator);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Start the notification service with the host
    pub fn with_notifications(mut self) -> Self {
        self.notifications = true;
        self
    }

    pub fn build(self) -> Result<ComponentHost> {
        let activator = self
            .activator
            .ok_or_else(|| DispatchError::Config("component activator is required".to_string()))?;
        let store = self
            .session_store
            .ok_or_else(|| DispatchError::Config("session store is required".to_string()))?;
        let authenticator = self
            .authenticator
            .unwrap_or_else(|| Arc::new(NullAuthenticationProvider));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemTimeProvider));

        let observers = Arc::new(CallObservers::new());
        for observer in self.observers {
            observers.add(observer);
        }

        let notifications = NotificationService::new();
        if self.notifications {
            notifications.start();
        }

        Ok(ComponentHost {
            sessions: Arc::new(SessionManager::new(
                store,
                authenticator,
                clock,
                Arc::clone(&observers),
            )),
            name: self.name,
            registry: ComponentRegistry::new(),
            serialization: SerializationHandling::new(),
            observers,
            interceptors: CallInterceptorCollection::new(),
            notifications,
            activator,
            transactions: self.transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::activation::mocks::FactoryActivator;
    use crate::port::session_store::mocks::MapSessionStore;

    #[test]
    fn test_build_requires_activator_and_store() {
        let err = ComponentHost::builder("test").build().err().unwrap();
        assert!(matches!(err, DispatchError::Config(_)));

        let err = ComponentHost::builder("test")
            .activator(Arc::new(FactoryActivator::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, DispatchError::Config(_)));
    }

    #[test]
    fn test_defaults() {
        let host = ComponentHost::builder("test")
            .activator(Arc::new(FactoryActivator::new()))
            .session_store(Arc::new(MapSessionStore::new(30)))
            .build()
            .unwrap();
        assert_eq!(host.name(), "test");
        assert!(host.transactions().is_none());
        assert!(!host.notifications().is_running());
        assert!(host.observers().is_empty());
        assert_eq!(host.sessions().session_age_limit(), 30);
    }
}
