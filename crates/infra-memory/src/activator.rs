// In-memory ComponentActivator Implementation

use async_trait::async_trait;
use remora_core::domain::{ActivationType, ComponentInstance, ComponentRegistration};
use remora_core::error::{DispatchError, Result};
use remora_core::port::ComponentActivator;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Builds instances from the registration factory.
///
/// Singletons are created once per unique name, even under concurrent first
/// calls. PerCall instances are tracked until released.
#[derive(Default)]
pub struct InMemoryActivator {
    singletons: Mutex<HashMap<String, Arc<ComponentInstance>>>,
    live: Mutex<HashSet<Uuid>>,
}

impl InMemoryActivator {
    pub fn new() -> Self {
        Self::default()
    }

    /// PerCall instances handed out and not yet released
    pub async fn live_instances(&self) -> usize {
        self.live.lock().await.len()
    }

    pub async fn singleton_count(&self) -> usize {
        self.singletons.lock().await.len()
    }
}

#[async_trait]
impl ComponentActivator for InMemoryActivator {
    async fn get_instance(
        &self,
        registration: &ComponentRegistration,
    ) -> Result<Arc<ComponentInstance>> {
        match registration.activation() {
            ActivationType::Singleton => {
                let mut singletons = self.singletons.lock().await;
                if let Some(existing) = singletons.get(registration.unique_name()) {
                    return Ok(existing.clone());
                }
                let instance = Arc::new(registration.create_instance());
                debug!(
                    component = %registration.unique_name(),
                    instance_id = %instance.id(),
                    "Singleton instance created"
                );
                singletons.insert(registration.unique_name().to_string(), instance.clone());
                Ok(instance)
            }
            ActivationType::PerCall => {
                let instance = Arc::new(registration.create_instance());
                self.live.lock().await.insert(instance.id());
                Ok(instance)
            }
        }
    }

    async fn release_instance(
        &self,
        registration: &ComponentRegistration,
        instance: Arc<ComponentInstance>,
    ) -> Result<()> {
        if registration.activation() == ActivationType::Singleton {
            return Ok(());
        }
        if !self.live.lock().await.remove(&instance.id()) {
            return Err(DispatchError::Activation(format!(
                "instance {} of '{}' is not live",
                instance.id(),
                registration.unique_name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_core::domain::InterfaceDescriptor;

    struct Counter;

    #[tokio::test]
    async fn test_singleton_is_shared() {
        let activator = InMemoryActivator::new();
        let registration =
            ComponentRegistration::singleton(InterfaceDescriptor::new("ICounter"), || Counter);

        let a = activator.get_instance(&registration).await.unwrap();
        let b = activator.get_instance(&registration).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(activator.singleton_count().await, 1);

        activator.release_instance(&registration, a).await.unwrap();
        assert_eq!(activator.live_instances().await, 0);
    }

    #[tokio::test]
    async fn test_per_call_released_exactly_once() {
        let activator = InMemoryActivator::new();
        let registration =
            ComponentRegistration::per_call(InterfaceDescriptor::new("ICounter"), || Counter);

        let a = activator.get_instance(&registration).await.unwrap();
        let b = activator.get_instance(&registration).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(activator.live_instances().await, 2);

        activator
            .release_instance(&registration, a.clone())
            .await
            .unwrap();
        let err = activator.release_instance(&registration, a).await.unwrap_err();
        assert!(matches!(err, DispatchError::Activation(_)));
        assert_eq!(activator.live_instances().await, 1);
    }
}
