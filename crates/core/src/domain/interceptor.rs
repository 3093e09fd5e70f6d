// Call interception rules

use crate::domain::types::{join_type_names, TypeName};
use crate::domain::value::CallValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of member a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Method,
    Event,
    Property,
}

/// Signature of an outgoing call as seen by the interceptor matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    pub member_kind: MemberKind,
    pub member_name: String,
    pub parameter_types: Vec<TypeName>,
}

impl CallSignature {
    pub fn method(member_name: impl Into<String>, parameter_types: Vec<TypeName>) -> Self {
        Self {
            member_kind: MemberKind::Method,
            member_name: member_name.into(),
            parameter_types,
        }
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {}({})",
            self.member_kind,
            self.member_name,
            join_type_names(&self.parameter_types)
        )
    }
}

/// Call handed to an interception handler.
///
/// Setting `return_value` short-circuits the remote call.
#[derive(Debug, Clone)]
pub struct InterceptedCall {
    pub signature: CallSignature,
    pub arguments: Vec<CallValue>,
    pub return_value: Option<CallValue>,
}

impl InterceptedCall {
    pub fn new(signature: CallSignature, arguments: Vec<CallValue>) -> Self {
        Self {
            signature,
            arguments,
            return_value: None,
        }
    }

    pub fn is_handled(&self) -> bool {
        self.return_value.is_some()
    }
}

pub type InterceptionHandler = Arc<dyn Fn(&mut InterceptedCall) + Send + Sync>;

/// Rule intercepting calls to one member of one component.
#[derive(Clone)]
pub struct CallInterceptor {
    pub interface_type: String,
    pub unique_name: String,
    pub member_kind: MemberKind,
    pub member_name: String,
    pub parameter_types: Vec<TypeName>,
    pub enabled: bool,
    handler: InterceptionHandler,
}

impl CallInterceptor {
    pub fn new<F>(
        interface_type: impl Into<String>,
        unique_name: impl Into<String>,
        member_kind: MemberKind,
        member_name: impl Into<String>,
        parameter_types: Vec<TypeName>,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut InterceptedCall) + Send + Sync + 'static,
    {
        Self {
            interface_type: interface_type.into(),
            unique_name: unique_name.into(),
            member_kind,
            member_name: member_name.into(),
            parameter_types,
            enabled: true,
            handler: Arc::new(handler),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Exact match on every key field; disabled rules never match.
    pub fn matches(&self, interface_type: &str, unique_name: &str, call: &CallSignature) -> bool {
        self.enabled
            && self.interface_type == interface_type
            && self.unique_name == unique_name
            && self.member_kind == call.member_kind
            && self.member_name == call.member_name
            && self.parameter_types == call.parameter_types
    }

    /// Run the interception handler.
    pub fn intercept(&self, call: &mut InterceptedCall) {
        (self.handler)(call)
    }
}

impl fmt::Debug for CallInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallInterceptor")
            .field("interface_type", &self.interface_type)
            .field("unique_name", &self.unique_name)
            .field("member_kind", &self.member_kind)
            .field("member_name", &self.member_name)
            .field("parameter_types", &self.parameter_types)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::type_list;
    use serde_json::json;

    fn rule() -> CallInterceptor {
        CallInterceptor::new(
            "ICalc",
            "ICalc",
            MemberKind::Method,
            "Add",
            type_list(["System.Int32", "System.Int32"]),
            |call| call.return_value = Some(CallValue::data(json!(42))),
        )
    }

    #[test]
    fn test_parameter_order_matters() {
        let rule = CallInterceptor::new(
            "ICalc",
            "ICalc",
            MemberKind::Method,
            "Mix",
            type_list(["System.Int32", "System.String"]),
            |_| {},
        );
        let same = CallSignature::method("Mix", type_list(["System.Int32", "System.String"]));
        let swapped = CallSignature::method("Mix", type_list(["System.String", "System.Int32"]));
        assert!(rule.matches("ICalc", "ICalc", &same));
        assert!(!rule.matches("ICalc", "ICalc", &swapped));
    }

    #[test]
    fn test_member_kind_and_enabled_flag() {
        let call = CallSignature::method("Add", type_list(["System.Int32", "System.Int32"]));
        assert!(rule().matches("ICalc", "ICalc", &call));
        assert!(!rule().disabled().matches("ICalc", "ICalc", &call));

        let as_event = CallSignature {
            member_kind: MemberKind::Event,
            ..call
        };
        assert!(!rule().matches("ICalc", "ICalc", &as_event));
    }

    #[test]
    fn test_intercept_sets_return_value() {
        let mut call = InterceptedCall::new(
            CallSignature::method("Add", type_list(["System.Int32", "System.Int32"])),
            vec![],
        );
        rule().intercept(&mut call);
        assert!(call.is_handled());
        assert_eq!(call.return_value.and_then(|v| v.as_i64()), Some(42));
    }
}
