// Component Domain Model
//
// Interfaces declare their methods, events and delegate properties up front.
// The dispatcher resolves calls against that table and wires callbacks
// through the declared slots only.

use crate::domain::context::CallScope;
use crate::domain::error::{DomainError, Result as DomainResult};
use crate::domain::types::{join_type_names, TypeName};
use crate::domain::value::CallValue;
use crate::domain::wire::{CorrelationId, DynamicWire};
use crate::error::InvocationFault;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Activation policy of a registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationType {
    /// One shared instance for every call
    Singleton,
    /// Fresh instance per invocation, released afterwards
    PerCall,
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationType::Singleton => write!(f, "SINGLETON"),
            ActivationType::PerCall => write!(f, "PER_CALL"),
        }
    }
}

/// Method table key: name, generic arity and exact parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub name: String,
    pub generic_arity: usize,
    pub parameter_types: Vec<TypeName>,
}

impl MethodKey {
    pub fn new(name: impl Into<String>, generic_arity: usize, parameter_types: Vec<TypeName>) -> Self {
        Self {
            name: name.into(),
            generic_arity,
            parameter_types,
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.generic_arity > 0 {
            write!(f, "`{}", self.generic_arity)?;
        }
        write!(f, "({})", join_type_names(&self.parameter_types))
    }
}

/// Everything a method handler receives for one invocation.
pub struct MethodCall {
    pub instance: Arc<ComponentInstance>,
    pub scope: CallScope,
    pub generic_arguments: Vec<TypeName>,
    pub arguments: Vec<CallValue>,
}

impl MethodCall {
    /// Shortcut to the instance state.
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.instance.state::<T>()
    }

    pub fn argument(&self, index: usize) -> Option<&CallValue> {
        self.arguments.get(index)
    }

    /// Integer argument, or an invocation fault naming the position.
    pub fn i64_arg(&self, index: usize) -> Result<i64, InvocationFault> {
        self.argument(index)
            .and_then(CallValue::as_i64)
            .ok_or_else(|| {
                InvocationFault::new("ArgumentException", format!("argument {index} is not an integer"))
            })
    }

    /// Server-side wire substituted for a delegate argument.
    pub fn wire_arg(&self, index: usize) -> Result<&DynamicWire, InvocationFault> {
        self.argument(index)
            .and_then(CallValue::as_wire)
            .ok_or_else(|| {
                InvocationFault::new("ArgumentException", format!("argument {index} is not a delegate"))
            })
    }
}

/// Future returned by a method handler
pub type MethodFuture = BoxFuture<'static, Result<CallValue, InvocationFault>>;

/// Type-erased method implementation
pub type MethodHandler = Arc<dyn Fn(MethodCall) -> MethodFuture + Send + Sync>;

#[derive(Clone)]
pub struct MethodDescriptor {
    pub key: MethodKey,
    pub one_way: bool,
    pub handler: MethodHandler,
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("key", &self.key)
            .field("one_way", &self.one_way)
            .finish_non_exhaustive()
    }
}

fn erase<F, Fut>(handler: F) -> MethodHandler
where
    F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallValue, InvocationFault>> + Send + 'static,
{
    Arc::new(move |call| handler(call).boxed())
}

/// Remote interface: method table plus declared event and delegate slots.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    name: String,
    methods: HashMap<MethodKey, MethodDescriptor>,
    events: BTreeSet<String>,
    delegates: BTreeSet<String>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            events: BTreeSet::new(),
            delegates: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method<F, Fut>(self, name: &str, parameter_types: Vec<TypeName>, handler: F) -> Self
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallValue, InvocationFault>> + Send + 'static,
    {
        self.insert(MethodKey::new(name, 0, parameter_types), false, erase(handler))
    }

    /// Method with `generic_arity` type parameters.
    pub fn generic_method<F, Fut>(
        self,
        name: &str,
        generic_arity: usize,
        parameter_types: Vec<TypeName>,
        handler: F,
    ) -> Self
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallValue, InvocationFault>> + Send + 'static,
    {
        self.insert(
            MethodKey::new(name, generic_arity, parameter_types),
            false,
            erase(handler),
        )
    }

    /// Fire-and-forget method: the caller gets `Unit` without waiting.
    pub fn one_way_method<F, Fut>(self, name: &str, parameter_types: Vec<TypeName>, handler: F) -> Self
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallValue, InvocationFault>> + Send + 'static,
    {
        self.insert(MethodKey::new(name, 0, parameter_types), true, erase(handler))
    }

    pub fn event(mut self, name: &str) -> Self {
        self.events.insert(name.to_string());
        self
    }

    pub fn delegate(mut self, name: &str) -> Self {
        self.delegates.insert(name.to_string());
        self
    }

    fn insert(mut self, key: MethodKey, one_way: bool, handler: MethodHandler) -> Self {
        self.methods.insert(
            key.clone(),
            MethodDescriptor {
                key,
                one_way,
                handler,
            },
        );
        self
    }

    pub fn resolve(&self, key: &MethodKey) -> Option<&MethodDescriptor> {
        self.methods.get(key)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains(name)
    }

    pub fn has_delegate(&self, name: &str) -> bool {
        self.delegates.contains(name)
    }

    /// Check that `member` is a declared event (or delegate property).
    pub fn require_slot(&self, member: &str, is_event: bool) -> DomainResult<()> {
        let declared = if is_event {
            self.has_event(member)
        } else {
            self.has_delegate(member)
        };
        if declared {
            Ok(())
        } else {
            Err(DomainError::UnknownSlot {
                interface: self.name.clone(),
                slot: member.to_string(),
            })
        }
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event handler lists and delegate property values of one instance.
#[derive(Debug, Default)]
pub struct CallbackSlots {
    events: Mutex<HashMap<String, Vec<DynamicWire>>>,
    delegates: Mutex<HashMap<String, DynamicWire>>,
}

impl CallbackSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_event(&self, event: &str, wire: DynamicWire) {
        lock(&self.events)
            .entry(event.to_string())
            .or_default()
            .push(wire);
    }

    /// Returns true if a handler with that wire id was attached.
    pub fn detach_event(&self, event: &str, wire_id: Uuid) -> bool {
        let mut events = lock(&self.events);
        let Some(handlers) = events.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|w| w.id() != wire_id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            events.remove(event);
        }
        removed
    }

    /// Assign (`Some`) or clear (`None`) a delegate property.
    pub fn set_delegate(&self, property: &str, wire: Option<DynamicWire>) {
        let mut delegates = lock(&self.delegates);
        match wire {
            Some(wire) => {
                delegates.insert(property.to_string(), wire);
            }
            None => {
                delegates.remove(property);
            }
        }
    }

    pub fn delegate(&self, property: &str) -> Option<DynamicWire> {
        lock(&self.delegates).get(property).cloned()
    }

    pub fn event_handler_count(&self, event: &str) -> usize {
        lock(&self.events).get(event).map_or(0, Vec::len)
    }

    /// Fire an event to every attached handler.
    ///
    /// Handlers run outside the lock, so a handler may detach itself.
    pub fn raise(&self, event: &str, args: Vec<CallValue>) -> Vec<Result<CallValue, InvocationFault>> {
        let handlers = lock(&self.events).get(event).cloned().unwrap_or_default();
        handlers
            .iter()
            .map(|wire| wire.invoke(args.clone()))
            .collect()
    }

    /// Call a delegate property; `None` if it is not assigned.
    pub fn invoke_delegate(
        &self,
        property: &str,
        args: Vec<CallValue>,
    ) -> Option<Result<CallValue, InvocationFault>> {
        self.delegate(property).map(|wire| wire.invoke(args))
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty() && lock(&self.delegates).is_empty()
    }
}

/// Live server-side object produced by the activation port.
pub struct ComponentInstance {
    id: Uuid,
    state: Arc<dyn Any + Send + Sync>,
    slots: CallbackSlots,
}

impl ComponentInstance {
    pub fn new<T: Any + Send + Sync>(state: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(state),
            slots: CallbackSlots::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    pub fn slots(&self) -> &CallbackSlots {
        &self.slots
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Correlation id -> wire records of one wiring scope.
#[derive(Debug, Default)]
pub struct WiringTable {
    wires: HashMap<CorrelationId, DynamicWire>,
}

impl WiringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, correlation_id: &CorrelationId) -> bool {
        self.wires.contains_key(correlation_id)
    }

    pub fn get(&self, correlation_id: &CorrelationId) -> Option<&DynamicWire> {
        self.wires.get(correlation_id)
    }

    pub fn insert(&mut self, correlation_id: CorrelationId, wire: DynamicWire) {
        self.wires.insert(correlation_id, wire);
    }

    pub fn remove(&mut self, correlation_id: &CorrelationId) -> Option<DynamicWire> {
        self.wires.remove(correlation_id)
    }

    pub fn len(&self) -> usize {
        self.wires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }
}

type InstanceFactory = Arc<dyn Fn() -> ComponentInstance + Send + Sync>;

/// Binding of a server interface to its implementation.
pub struct ComponentRegistration {
    interface: InterfaceDescriptor,
    implementation_type: TypeName,
    unique_name: String,
    activation: ActivationType,
    factory: InstanceFactory,
    // Only used for Singleton components
    event_wirings: Mutex<WiringTable>,
}

impl ComponentRegistration {
    fn with_factory<T, F>(interface: InterfaceDescriptor, activation: ActivationType, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            unique_name: interface.name().to_string(),
            interface,
            implementation_type: TypeName::of::<T>(),
            activation,
            factory: Arc::new(move || ComponentInstance::new(factory())),
            event_wirings: Mutex::new(WiringTable::new()),
        }
    }

    pub fn per_call<T, F>(interface: InterfaceDescriptor, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_factory(interface, ActivationType::PerCall, factory)
    }

    pub fn singleton<T, F>(interface: InterfaceDescriptor, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_factory(interface, ActivationType::Singleton, factory)
    }

    /// Override the unique name (defaults to the interface name).
    pub fn with_unique_name(mut self, unique_name: impl Into<String>) -> Self {
        self.unique_name = unique_name.into();
        self
    }

    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    pub fn interface_name(&self) -> &str {
        self.interface.name()
    }

    pub fn implementation_type(&self) -> &TypeName {
        &self.implementation_type
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn activation(&self) -> ActivationType {
        self.activation
    }

    /// Build a new instance; called by activation adapters.
    pub fn create_instance(&self) -> ComponentInstance {
        (self.factory)()
    }

    pub fn event_wirings(&self) -> MutexGuard<'_, WiringTable> {
        lock(&self.event_wirings)
    }

    pub fn info(&self) -> ComponentInfo {
        ComponentInfo {
            interface_name: self.interface_name().to_string(),
            unique_name: self.unique_name.clone(),
            implementation_type: self.implementation_type.to_string(),
            activation_type: self.activation,
        }
    }
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("interface", &self.interface.name())
            .field("unique_name", &self.unique_name)
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

/// Public description of a registered component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    pub interface_name: String,
    pub unique_name: String,
    pub implementation_type: String,
    pub activation_type: ActivationType,
}
