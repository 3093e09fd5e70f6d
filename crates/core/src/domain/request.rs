// Remote call envelope

use crate::domain::types::{join_type_names, TypeName};
use crate::domain::value::CallValue;
use crate::domain::wire::{CorrelationId, DelegateInterceptor};
use uuid::Uuid;

/// Request to bind a remote callback to a server event or delegate property.
#[derive(Debug, Clone)]
pub struct DelegateCorrelationInfo {
    pub correlation_id: CorrelationId,
    pub member_name: String,
    pub is_event: bool,
    pub interceptor: DelegateInterceptor,
}

impl DelegateCorrelationInfo {
    /// Correlation for an event slot
    pub fn event(member_name: impl Into<String>, interceptor: DelegateInterceptor) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            member_name: member_name.into(),
            is_event: true,
            interceptor,
        }
    }

    /// Correlation for an output-delegate property
    pub fn delegate(member_name: impl Into<String>, interceptor: DelegateInterceptor) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            member_name: member_name.into(),
            is_event: false,
            interceptor,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// One remote call as deserialized by the transport.
///
/// `parameter_types` and `arguments` are parallel lists.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub tracking_id: Uuid,
    pub interface_name: String,
    pub method_name: String,
    pub generic_arguments: Vec<TypeName>,
    pub parameter_types: Vec<TypeName>,
    pub arguments: Vec<CallValue>,
    pub correlation_set: Vec<DelegateCorrelationInfo>,
}

impl InvocationRequest {
    pub fn new(
        tracking_id: Uuid,
        interface_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            tracking_id,
            interface_name: interface_name.into(),
            method_name: method_name.into(),
            generic_arguments: Vec::new(),
            parameter_types: Vec::new(),
            arguments: Vec::new(),
            correlation_set: Vec::new(),
        }
    }

    /// Append one parameter type and its argument value.
    pub fn with_argument(mut self, parameter_type: impl Into<TypeName>, value: CallValue) -> Self {
        self.parameter_types.push(parameter_type.into());
        self.arguments.push(value);
        self
    }

    pub fn with_generic_argument(mut self, type_name: impl Into<TypeName>) -> Self {
        self.generic_arguments.push(type_name.into());
        self
    }

    pub fn with_correlation(mut self, correlation: DelegateCorrelationInfo) -> Self {
        self.correlation_set.push(correlation);
        self
    }

    /// `Interface.Method<G>(P1, P2)` as used in log lines.
    pub fn describe(&self) -> String {
        let generics = if self.generic_arguments.is_empty() {
            String::new()
        } else {
            format!("<{}>", join_type_names(&self.generic_arguments))
        };
        format!(
            "{}.{}{}({})",
            self.interface_name,
            self.method_name,
            generics,
            join_type_names(&self.parameter_types)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_includes_generics_and_parameters() {
        let request = InvocationRequest::new(Uuid::new_v4(), "ICalc", "Add")
            .with_argument("int", CallValue::data(json!(2)))
            .with_argument("int", CallValue::data(json!(3)));
        assert_eq!(request.describe(), "ICalc.Add(int, int)");

        let generic = InvocationRequest::new(Uuid::new_v4(), "IStore", "Get")
            .with_generic_argument("Invoice");
        assert_eq!(generic.describe(), "IStore.Get<Invoice>()");
    }
}
