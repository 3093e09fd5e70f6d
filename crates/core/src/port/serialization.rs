// Serialization Handler Port

use crate::domain::{CallValue, TypeName};
use crate::error::Result;

/// Custom binary encoding for one declared type (and types assignable to it).
pub trait SerializationHandler: Send + Sync {
    /// Encode a typed value into bytes
    fn serialize(&self, value: &CallValue) -> Result<Vec<u8>>;

    /// Decode bytes produced by `serialize` for `data_type`
    fn deserialize(&self, data_type: &TypeName, data: &[u8]) -> Result<CallValue>;
}
