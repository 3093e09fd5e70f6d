// Dynamic call values (arguments and return values)

use crate::domain::types::TypeName;
use crate::domain::wire::{DelegateInterceptor, DynamicWire};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Argument or return value that travels through a custom serialization
/// handler instead of the default formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSerializationContainer {
    /// Type the handler was registered for
    pub handled_type: TypeName,
    /// Runtime type of the encoded value
    pub data_type: TypeName,
    /// Bytes produced by the handler
    pub data: Vec<u8>,
}

impl CustomSerializationContainer {
    pub fn new(handled_type: TypeName, data_type: TypeName, data: Vec<u8>) -> Self {
        Self {
            handled_type,
            data_type,
            data,
        }
    }
}

/// Opaque server-side object tagged with its runtime type name.
#[derive(Clone)]
pub struct TypedObject {
    type_name: TypeName,
    value: Arc<dyn Any + Send + Sync>,
}

impl TypedObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: TypeName::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Wrap a value under an explicit type name (e.g. a wire-level name).
    pub fn named<T: Any + Send + Sync>(type_name: TypeName, value: T) -> Self {
        Self {
            type_name,
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for TypedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedObject")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A single argument or return value of a remote call.
#[derive(Debug, Clone)]
pub enum CallValue {
    /// No value (void methods, one-way dispatch)
    Unit,
    /// Plain data handled by the default formatter
    Data(serde_json::Value),
    /// Typed object that may need a custom serialization handler
    Object(TypedObject),
    /// Encoded value awaiting its serialization handler
    Serialized(CustomSerializationContainer),
    /// Client-side callback placeholder (delegate parameter)
    Delegate(DelegateInterceptor),
    /// Server-side callback substituted for a delegate placeholder
    Wire(DynamicWire),
}

impl CallValue {
    pub fn data(value: impl Into<serde_json::Value>) -> Self {
        CallValue::Data(value.into())
    }

    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        CallValue::Object(TypedObject::new(value))
    }

    /// Runtime type used for return-value handler lookup.
    ///
    /// Only typed objects carry one; plain data always goes through the
    /// default formatter.
    pub fn runtime_type(&self) -> Option<&TypeName> {
        match self {
            CallValue::Object(obj) => Some(obj.type_name()),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, CallValue::Unit)
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            CallValue::Data(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(serde_json::Value::as_i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(serde_json::Value::as_str)
    }

    pub fn as_object<T: Any>(&self) -> Option<&T> {
        match self {
            CallValue::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&CustomSerializationContainer> {
        match self {
            CallValue::Serialized(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> Option<&DynamicWire> {
        match self {
            CallValue::Wire(w) => Some(w),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for CallValue {
    fn from(value: serde_json::Value) -> Self {
        CallValue::Data(value)
    }
}

impl From<CustomSerializationContainer> for CallValue {
    fn from(container: CustomSerializationContainer) -> Self {
        CallValue::Serialized(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Invoice {
        number: u32,
    }

    #[test]
    fn test_runtime_type_only_for_objects() {
        assert!(CallValue::data(json!(5)).runtime_type().is_none());
        assert!(CallValue::Unit.runtime_type().is_none());

        let value = CallValue::object(Invoice { number: 7 });
        assert_eq!(value.runtime_type(), Some(&TypeName::of::<Invoice>()));
        assert_eq!(value.as_object::<Invoice>(), Some(&Invoice { number: 7 }));
        assert!(value.as_object::<String>().is_none());
    }

    #[test]
    fn test_container_serde_round_trip() {
        let container = CustomSerializationContainer::new(
            TypeName::new("Invoice"),
            TypeName::new("SignedInvoice"),
            vec![1, 2, 3],
        );
        let encoded = serde_json::to_string(&container).unwrap();
        let decoded: CustomSerializationContainer = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, container);
    }
}
