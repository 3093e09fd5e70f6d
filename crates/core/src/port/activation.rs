// Component activation port

use crate::domain::{ComponentInstance, ComponentRegistration};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Creates and destroys component instances.
///
/// Implementations decide how Singleton instances are cached; the
/// dispatcher only promises to release every PerCall instance exactly once.
#[async_trait]
pub trait ComponentActivator: Send + Sync {
    /// Resolve an instance for one invocation
    async fn get_instance(
        &self,
        registration: &ComponentRegistration,
    ) -> Result<Arc<ComponentInstance>>;

    /// Give a PerCall instance back after the invocation
    async fn release_instance(
        &self,
        registration: &ComponentRegistration,
        instance: Arc<ComponentInstance>,
    ) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::ActivationType;
    use crate::error::DispatchError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Activator that builds instances straight from the registration.
    #[derive(Default)]
    pub struct FactoryActivator {
        singletons: Mutex<HashMap<String, Arc<ComponentInstance>>>,
        created: Mutex<Vec<Uuid>>,
        released: Mutex<Vec<Uuid>>,
        fail_with: Mutex<Option<String>>,
    }

    impl FactoryActivator {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every following `get_instance` fail.
        pub fn fail_next(&self, message: impl Into<String>) {
            *self.fail_with.lock().unwrap() = Some(message.into());
        }

        pub fn created(&self) -> Vec<Uuid> {
            self.created.lock().unwrap().clone()
        }

        pub fn released(&self) -> Vec<Uuid> {
            self.released.lock().unwrap().clone()
        }

        /// Most recently created instance, e.g. to inspect its slots.
        pub fn last_created(&self) -> Option<Uuid> {
            self.created.lock().unwrap().last().copied()
        }
    }

    #[async_trait]
    impl ComponentActivator for FactoryActivator {
        async fn get_instance(
            &self,
            registration: &ComponentRegistration,
        ) -> Result<Arc<ComponentInstance>> {
            if let Some(message) = self.fail_with.lock().unwrap().clone() {
                return Err(DispatchError::Activation(message));
            }
            let instance = match registration.activation() {
                ActivationType::Singleton => self
                    .singletons
                    .lock()
                    .unwrap()
                    .entry(registration.unique_name().to_string())
                    .or_insert_with(|| Arc::new(registration.create_instance()))
                    .clone(),
                ActivationType::PerCall => Arc::new(registration.create_instance()),
            };
            self.created.lock().unwrap().push(instance.id());
            Ok(instance)
        }

        async fn release_instance(
            &self,
            _registration: &ComponentRegistration,
            instance: Arc<ComponentInstance>,
        ) -> Result<()> {
            self.released.lock().unwrap().push(instance.id());
            Ok(())
        }
    }
}
