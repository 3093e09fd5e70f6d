// Component Registry

use crate::domain::{ComponentInfo, ComponentRegistration};
use crate::error::{DispatchError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Registered components keyed by unique name.
///
/// Lookup is by unique name only. It defaults to the interface name, but a
/// component registered under a custom unique name is not reachable by its
/// interface name.
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, Arc<ComponentRegistration>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, registration: ComponentRegistration) -> Result<Arc<ComponentRegistration>> {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let name = registration.unique_name().to_string();
        if components.contains_key(&name) {
            return Err(DispatchError::Argument(format!(
                "a component named '{name}' is already registered"
            )));
        }

        info!(
            unique_name = %name,
            interface = %registration.interface_name(),
            activation = %registration.activation(),
            methods = registration.interface().method_count(),
            "Component registered"
        );
        let registration = Arc::new(registration);
        components.insert(name, Arc::clone(&registration));
        Ok(registration)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ComponentRegistration>> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Component descriptions ordered by unique name
    pub fn infos(&self) -> Vec<ComponentInfo> {
        let mut infos: Vec<_> = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|r| r.info())
            .collect();
        infos.sort_by(|a, b| a.unique_name.cmp(&b.unique_name));
        infos
    }

    pub fn len(&self) -> usize {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivationType, InterfaceDescriptor};

    #[test]
    fn test_register_and_lookup() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::per_call(InterfaceDescriptor::new("ICalc"), || ()))
            .unwrap();
        registry
            .register(
                ComponentRegistration::singleton(InterfaceDescriptor::new("ICalc"), || ())
                    .with_unique_name("calc-shared"),
            )
            .unwrap();

        assert!(registry.contains("ICalc"));
        assert_eq!(
            registry.get("calc-shared").map(|r| r.activation()),
            Some(ActivationType::Singleton)
        );
        assert!(registry.get("IMissing").is_none());

        let names: Vec<_> = registry.infos().into_iter().map(|i| i.unique_name).collect();
        assert_eq!(names, vec!["ICalc", "calc-shared"]);
    }

    #[test]
    fn test_duplicate_unique_name_rejected() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::per_call(InterfaceDescriptor::new("ICalc"), || ()))
            .unwrap();
        let err = registry
            .register(ComponentRegistration::singleton(InterfaceDescriptor::new("ICalc"), || ()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Argument(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_custom_unique_name_hides_interface_name() {
        let registry = ComponentRegistry::new();
        registry
            .register(
                ComponentRegistration::singleton(InterfaceDescriptor::new("ICalc"), || ())
                    .with_unique_name("calc-shared"),
            )
            .unwrap();

        assert!(registry.get("calc-shared").is_some());
        assert!(registry.get("ICalc").is_none());
        assert!(!registry.contains("ICalc"));
    }
}
