// Call Interceptor Collection

use crate::domain::{CallInterceptor, CallSignature, InterceptedCall, MemberKind, TypeName};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Registered interception rules.
///
/// One collection-wide lock guards every operation, so a lookup never sees
/// a half-applied `add_range`.
#[derive(Default)]
pub struct CallInterceptorCollection {
    interceptors: Mutex<Vec<CallInterceptor>>,
}

impl CallInterceptorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CallInterceptor>> {
        self.interceptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, interceptor: CallInterceptor) {
        debug!(
            interface = %interceptor.interface_type,
            member = %interceptor.member_name,
            "Call interceptor added"
        );
        self.lock().push(interceptor);
    }

    pub fn add_range<I>(&self, interceptors: I)
    where
        I: IntoIterator<Item = CallInterceptor>,
    {
        self.lock().extend(interceptors);
    }

    /// First enabled interceptor matching every key field, if any.
    pub fn find_matching(
        &self,
        interface_type: &str,
        unique_name: &str,
        call: &CallSignature,
    ) -> Option<CallInterceptor> {
        self.lock()
            .iter()
            .find(|i| i.matches(interface_type, unique_name, call))
            .cloned()
    }

    /// Run the matching interceptor, if any. Returns true if one ran.
    pub fn intercept(&self, interface_type: &str, unique_name: &str, call: &mut InterceptedCall) -> bool {
        match self.find_matching(interface_type, unique_name, &call.signature) {
            Some(interceptor) => {
                interceptor.intercept(call);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Fluent registration for members of one interface.
    pub fn for_interface(&self, interface_type: impl Into<String>) -> InterceptorBuilder<'_> {
        let interface_type = interface_type.into();
        InterceptorBuilder {
            collection: self,
            unique_name: interface_type.clone(),
            interface_type,
        }
    }
}

pub struct InterceptorBuilder<'a> {
    collection: &'a CallInterceptorCollection,
    interface_type: String,
    unique_name: String,
}

impl InterceptorBuilder<'_> {
    /// Target a component registered under a non-default unique name.
    pub fn with_unique_name(mut self, unique_name: impl Into<String>) -> Self {
        self.unique_name = unique_name.into();
        self
    }

    pub fn on_method<F>(self, name: &str, parameter_types: Vec<TypeName>, handler: F) -> Self
    where
        F: Fn(&mut InterceptedCall) + Send + Sync + 'static,
    {
        self.on(MemberKind::Method, name, parameter_types, handler)
    }

    pub fn on_event<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut InterceptedCall) + Send + Sync + 'static,
    {
        self.on(MemberKind::Event, name, Vec::new(), handler)
    }

    pub fn on_property<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut InterceptedCall) + Send + Sync + 'static,
    {
        self.on(MemberKind::Property, name, Vec::new(), handler)
    }

    fn on<F>(self, kind: MemberKind, name: &str, parameter_types: Vec<TypeName>, handler: F) -> Self
    where
        F: Fn(&mut InterceptedCall) + Send + Sync + 'static,
    {
        self.collection.add(CallInterceptor::new(
            self.interface_type.clone(),
            self.unique_name.clone(),
            kind,
            name,
            parameter_types,
            handler,
        ));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::type_list;
    use crate::domain::CallValue;
    use serde_json::json;

    #[test]
    fn test_find_matching_skips_disabled_and_returns_first() {
        let collection = CallInterceptorCollection::new();
        let params = type_list(["System.Int32", "System.Int32"]);
        collection.add_range([
            CallInterceptor::new("ICalc", "ICalc", MemberKind::Method, "Add", params.clone(), |c| {
                c.return_value = Some(CallValue::data(json!(0)))
            })
            .disabled(),
            CallInterceptor::new("ICalc", "ICalc", MemberKind::Method, "Add", params.clone(), |c| {
                c.return_value = Some(CallValue::data(json!(1)))
            }),
            CallInterceptor::new("ICalc", "ICalc", MemberKind::Method, "Add", params.clone(), |c| {
                c.return_value = Some(CallValue::data(json!(2)))
            }),
        ]);

        let mut call = InterceptedCall::new(CallSignature::method("Add", params), vec![]);
        assert!(collection.intercept("ICalc", "ICalc", &mut call));
        assert_eq!(call.return_value.and_then(|v| v.as_i64()), Some(1));
    }

    #[test]
    fn test_no_match_on_other_component() {
        let collection = CallInterceptorCollection::new();
        collection
            .for_interface("ICalc")
            .with_unique_name("calc-a")
            .on_method("Add", type_list(["System.Int32"]), |_| {})
            .on_event("Changed", |_| {});
        assert_eq!(collection.len(), 2);

        let call = CallSignature::method("Add", type_list(["System.Int32"]));
        assert!(collection.find_matching("ICalc", "calc-a", &call).is_some());
        assert!(collection.find_matching("ICalc", "calc-b", &call).is_none());
        assert!(collection.find_matching("IOther", "calc-a", &call).is_none());

        collection.clear();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_concurrent_add_and_find() {
        let collection = std::sync::Arc::new(CallInterceptorCollection::new());
        let params = type_list(["System.String"]);

        let writers: Vec<_> = (0..4)
            .map(|n| {
                let collection = collection.clone();
                let params = params.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        collection.add(CallInterceptor::new(
                            "IStore",
                            "IStore",
                            MemberKind::Method,
                            format!("Op{n}_{i}"),
                            params.clone(),
                            |_| {},
                        ));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(collection.len(), 100);
        let call = CallSignature::method("Op3_24", params);
        assert!(collection.find_matching("IStore", "IStore", &call).is_some());
    }
}
