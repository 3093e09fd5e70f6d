// Custom serialization handler registry

use crate::domain::{CallValue, CustomSerializationContainer, TypeName, TypedObject};
use crate::error::{DispatchError, Result};
use crate::port::SerializationHandler;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Default)]
struct Registrations {
    handlers: HashMap<TypeName, Arc<dyn SerializationHandler>>,
    // derived type -> declared type whose handler also covers it
    assignable: HashMap<TypeName, TypeName>,
}

/// Handlers keyed by the declared type they encode.
#[derive(Default)]
pub struct SerializationHandling {
    inner: RwLock<Registrations>,
}

impl SerializationHandling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handled_type: TypeName, handler: Arc<dyn SerializationHandler>) {
        debug!(handled_type = %handled_type, "Serialization handler registered");
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .insert(handled_type, handler);
    }

    /// Declare `derived` assignable to `declared`, so a value of the
    /// derived runtime type is encoded by the declared type's handler.
    pub fn register_assignable(&self, declared: TypeName, derived: TypeName) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .assignable
            .insert(derived, declared);
    }

    /// Handler registered for exactly `declared`
    pub fn get(&self, declared: &TypeName) -> Option<Arc<dyn SerializationHandler>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .get(declared)
            .cloned()
    }

    /// Handler for a runtime type: exact match first, then assignable.
    ///
    /// Returns the type the handler was registered for along with it.
    pub fn find_matching(
        &self,
        runtime: &TypeName,
    ) -> Option<(TypeName, Arc<dyn SerializationHandler>)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(handler) = inner.handlers.get(runtime) {
            return Some((runtime.clone(), Arc::clone(handler)));
        }
        let declared = inner.assignable.get(runtime)?;
        inner
            .handlers
            .get(declared)
            .map(|handler| (declared.clone(), Arc::clone(handler)))
    }

    /// Encode a typed value if some handler covers its runtime type.
    pub fn encode(&self, value: &CallValue) -> Result<Option<CustomSerializationContainer>> {
        let Some(runtime) = value.runtime_type() else {
            return Ok(None);
        };
        let Some((handled_type, handler)) = self.find_matching(runtime) else {
            return Ok(None);
        };
        let data = handler.serialize(value)?;
        Ok(Some(CustomSerializationContainer::new(
            handled_type,
            runtime.clone(),
            data,
        )))
    }

    /// Return values leave either as-is or wrapped in a container.
    pub fn wrap_return_value(&self, value: CallValue) -> Result<CallValue> {
        match self.encode(&value)? {
            Some(container) => Ok(CallValue::Serialized(container)),
            None => Ok(value),
        }
    }

    pub fn decode(&self, container: &CustomSerializationContainer) -> Result<CallValue> {
        let handler = self.get(&container.handled_type).ok_or_else(|| {
            DispatchError::SerializationHandlerNotFound(container.handled_type.clone())
        })?;
        handler.deserialize(&container.data_type, &container.data)
    }
}

/// Handler encoding `T` as JSON bytes.
pub struct JsonSerializationHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializationHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializationHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SerializationHandler for JsonSerializationHandler<T>
where
    T: Serialize + DeserializeOwned + Any + Send + Sync,
{
    fn serialize(&self, value: &CallValue) -> Result<Vec<u8>> {
        let typed = value.as_object::<T>().ok_or_else(|| {
            DispatchError::Serialization(format!(
                "value is not a {}",
                std::any::type_name::<T>()
            ))
        })?;
        Ok(serde_json::to_vec(typed)?)
    }

    fn deserialize(&self, data_type: &TypeName, data: &[u8]) -> Result<CallValue> {
        let typed: T = serde_json::from_slice(data)?;
        Ok(CallValue::Object(TypedObject::named(data_type.clone(), typed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        number: u32,
    }

    fn handling() -> SerializationHandling {
        let handling = SerializationHandling::new();
        handling.register(
            TypeName::of::<Invoice>(),
            Arc::new(JsonSerializationHandler::<Invoice>::new()),
        );
        handling
    }

    #[test]
    fn test_plain_data_passes_through() {
        let value = handling()
            .wrap_return_value(CallValue::data(serde_json::json!(5)))
            .unwrap();
        assert_eq!(value.as_i64(), Some(5));
    }

    #[test]
    fn test_typed_return_value_is_wrapped() {
        let value = handling()
            .wrap_return_value(CallValue::object(Invoice { number: 9 }))
            .unwrap();
        let container = value.as_container().unwrap();
        assert_eq!(container.handled_type, TypeName::of::<Invoice>());
        assert_eq!(container.data, br#"{"number":9}"#.to_vec());
    }

    #[test]
    fn test_assignable_lookup_keeps_runtime_type() {
        let handling = handling();
        let derived = TypeName::new("SignedInvoice");
        assert!(handling.find_matching(&derived).is_none());

        handling.register_assignable(TypeName::of::<Invoice>(), derived.clone());
        let (handled, _) = handling.find_matching(&derived).unwrap();
        assert_eq!(handled, TypeName::of::<Invoice>());

        let value = CallValue::Object(TypedObject::named(derived.clone(), Invoice { number: 1 }));
        let container = handling.encode(&value).unwrap().unwrap();
        assert_eq!(container.data_type, derived);
    }

    #[test]
    fn test_decode_requires_exact_handler() {
        let container = CustomSerializationContainer::new(
            TypeName::new("Unknown"),
            TypeName::new("Unknown"),
            vec![],
        );
        assert!(matches!(
            handling().decode(&container),
            Err(DispatchError::SerializationHandlerNotFound(_))
        ));

        let container = CustomSerializationContainer::new(
            TypeName::of::<Invoice>(),
            TypeName::of::<Invoice>(),
            br#"{"number":3}"#.to_vec(),
        );
        let decoded = handling().decode(&container).unwrap();
        assert_eq!(decoded.as_object::<Invoice>(), Some(&Invoice { number: 3 }));
    }
}
