// Type names used in call signatures and serialization lookup

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified type name.
///
/// Parameter signatures, generic arguments and serialization handlers are
/// all keyed by this name; two types match only if their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Name of a Rust type as reported by the compiler.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Build an owned parameter-type list from string names.
pub fn type_list<I, S>(names: I) -> Vec<TypeName>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(|n| TypeName::new(n)).collect()
}

/// Render a parameter list the way signatures print it: `int, int`.
pub fn join_type_names(types: &[TypeName]) -> String {
    types
        .iter()
        .map(TypeName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_of_uses_rust_path() {
        assert_eq!(TypeName::of::<i64>().as_str(), "i64");
        assert!(TypeName::of::<String>().as_str().ends_with("String"));
    }

    #[test]
    fn test_join_type_names() {
        let types = type_list(["System.Int32", "System.String"]);
        assert_eq!(join_type_names(&types), "System.Int32, System.String");
        assert_eq!(join_type_names(&[]), "");
    }
}
