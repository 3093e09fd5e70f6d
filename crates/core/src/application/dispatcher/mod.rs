// Dispatcher - end-to-end handling of one remote invocation

mod cleanup;
mod panic_guard;

pub use panic_guard::execute_guarded;

use cleanup::{CallCleanup, CancelOnDrop};

use crate::application::host::ComponentHost;
use crate::application::wiring::{create_wires, remove_wires};
use crate::domain::{
    ActivationType, CallContext, CallScope, CallValue, ComponentInfo, ComponentInstance,
    ComponentRegistration, CorrelationId, DelegateCorrelationInfo, DelegateInterceptor,
    DynamicWire, InvocationRequest, MethodCall, MethodKey, SessionId, TransactionHandle,
    TypeName,
};
use crate::error::{DispatchError, Result};
use crate::port::{
    AfterInvokeArgs, Credentials, InvokeCanceledArgs, InvokeDecision, TransactionScope,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_CANCEL_MESSAGE: &str = "the call was canceled by the server";

/// Server-side entry point for remote calls.
///
/// Holds no per-call state; any number of invocations may run on it
/// concurrently.
pub struct Dispatcher {
    host: Arc<ComponentHost>,
}

/// Outcome of the checks that run before any argument is touched
struct Admission {
    registration: Arc<ComponentRegistration>,
    scope: CallScope,
    transaction: Option<Box<dyn TransactionScope>>,
}

struct Materialized {
    arguments: Vec<CallValue>,
    delegate_positions: Vec<usize>,
}

impl Dispatcher {
    pub fn new(host: Arc<ComponentHost>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<ComponentHost> {
        &self.host
    }

    /// Invoke a method of a registered component.
    ///
    /// Every error is returned after exactly one call-canceled notification,
    /// except for a missing interface or method name, which is rejected
    /// before observers see the request. Dropping the returned future
    /// before it completes also fires one call-canceled notification.
    pub async fn invoke(
        &self,
        mut request: InvocationRequest,
        ctx: &CallContext,
    ) -> Result<CallValue> {
        if request.interface_name.is_empty() {
            return Err(DispatchError::Argument(
                "interface name is missing".to_string(),
            ));
        }
        if request.method_name.is_empty() {
            return Err(DispatchError::Argument("method name is missing".to_string()));
        }

        let observers = self.host.observers();
        if let InvokeDecision::Cancel(reason) = observers.before_invoke(&mut request) {
            let error = DispatchError::InvokeCanceled(
                reason.unwrap_or_else(|| DEFAULT_CANCEL_MESSAGE.to_string()),
            );
            return Err(self.cancel(request.tracking_id, error));
        }

        let tracking_id = request.tracking_id;
        let observed = (!observers.is_empty()).then(|| {
            (
                request.interface_name.clone(),
                request.method_name.clone(),
                request.arguments.clone(),
            )
        });
        debug!(tracking_id = %tracking_id, call = %request.describe(), "Dispatching call");

        let mut abandoned = CancelOnDrop::new(&self.host, tracking_id);
        let outcome = self.dispatch(request, ctx).await;
        abandoned.disarm();

        match outcome {
            Ok(value) => {
                if let Some((interface_name, method_name, arguments)) = observed {
                    observers.after_invoke(&AfterInvokeArgs {
                        tracking_id,
                        interface_name: &interface_name,
                        method_name: &method_name,
                        arguments: &arguments,
                        return_value: &value,
                    });
                }
                Ok(value)
            }
            Err(error) => Err(self.cancel(tracking_id, error)),
        }
    }

    fn cancel(&self, tracking_id: Uuid, error: DispatchError) -> DispatchError {
        info!(tracking_id = %tracking_id, error = %error, "Call canceled");
        self.host
            .observers()
            .invoke_canceled(&InvokeCanceledArgs {
                tracking_id,
                error: &error,
            });
        error
    }

    async fn dispatch(&self, request: InvocationRequest, ctx: &CallContext) -> Result<CallValue> {
        let InvocationRequest {
            tracking_id,
            interface_name,
            method_name,
            generic_arguments,
            parameter_types,
            arguments,
            correlation_set,
        } = request;

        let Admission {
            registration,
            scope,
            transaction,
        } = self.admit(tracking_id, &interface_name, ctx).await?;

        let mut cleanup = CallCleanup::new(
            Arc::clone(&self.host),
            tracking_id,
            Arc::clone(&registration),
            transaction,
        );

        let materialized = match self.materialize(arguments, &parameter_types) {
            Ok(materialized) => materialized,
            Err(error) => {
                cleanup.finish(false).await;
                return Err(error);
            }
        };

        let instance = match self.host.activator().get_instance(&registration).await {
            Ok(instance) => instance,
            Err(error) => {
                cleanup.finish(false).await;
                return Err(error);
            }
        };

        let wired = if registration.activation() == ActivationType::PerCall {
            let lease = cleanup.lease(Arc::clone(&instance), correlation_set);
            create_wires(
                registration.interface(),
                &lease.instance,
                &lease.correlations,
                &mut lease.wirings,
            )
            .map(|_| ())
        } else {
            Ok(())
        };

        let outcome = match wired {
            Ok(()) => {
                let key = MethodKey::new(method_name, generic_arguments.len(), parameter_types);
                self.execute(
                    &registration,
                    instance,
                    scope,
                    key,
                    generic_arguments,
                    materialized,
                )
                .await
            }
            Err(error) => Err(error),
        };

        cleanup.finish(outcome.is_ok()).await;

        let value = outcome?;
        self.host.serialization().wrap_return_value(value)
    }

    /// Component lookup, context and session checks, transaction join.
    async fn admit(
        &self,
        tracking_id: Uuid,
        interface_name: &str,
        ctx: &CallContext,
    ) -> Result<Admission> {
        let registration = self
            .host
            .registry()
            .get(interface_name)
            .ok_or_else(|| DispatchError::ComponentNotFound(interface_name.to_string()))?;

        let data = ctx
            .data
            .as_ref()
            .ok_or_else(|| DispatchError::Security("call context data missing".to_string()))?;
        let session_id = data.session_id.unwrap_or_else(SessionId::nil);
        let session = self.host.sessions().validate(session_id, ctx)?;

        let transaction = match &data.transaction {
            Some(handle) => Some(self.join_transaction(handle).await?),
            None => None,
        };

        Ok(Admission {
            registration,
            scope: CallScope::new(tracking_id, session),
            transaction,
        })
    }

    async fn join_transaction(&self, handle: &TransactionHandle) -> Result<Box<dyn TransactionScope>> {
        let coordinator = self.host.transactions().ok_or_else(|| {
            DispatchError::Transaction(format!(
                "no transaction coordinator configured to join '{handle}'"
            ))
        })?;
        coordinator.join(handle).await
    }

    /// Decode custom-serialized arguments and note delegate positions.
    fn materialize(&self, arguments: Vec<CallValue>, parameter_types: &[TypeName]) -> Result<Materialized> {
        if arguments.len() != parameter_types.len() {
            return Err(DispatchError::Argument(format!(
                "{} arguments supplied for {} parameter types",
                arguments.len(),
                parameter_types.len()
            )));
        }

        let mut delegate_positions = Vec::new();
        let mut materialized = Vec::with_capacity(arguments.len());
        for (position, argument) in arguments.into_iter().enumerate() {
            let value = match argument {
                CallValue::Serialized(container) => {
                    self.host.serialization().decode(&container)?
                }
                CallValue::Delegate(interceptor) => {
                    delegate_positions.push(position);
                    CallValue::Delegate(interceptor)
                }
                other => other,
            };
            materialized.push(value);
        }

        Ok(Materialized {
            arguments: materialized,
            delegate_positions,
        })
    }

    async fn execute(
        &self,
        registration: &ComponentRegistration,
        instance: Arc<ComponentInstance>,
        scope: CallScope,
        key: MethodKey,
        generic_arguments: Vec<TypeName>,
        materialized: Materialized,
    ) -> Result<CallValue> {
        let method = registration
            .interface()
            .resolve(&key)
            .cloned()
            .ok_or_else(|| {
                DispatchError::MethodNotFound(format!(
                    "{}.{} on '{}'",
                    registration.interface_name(),
                    key,
                    registration.implementation_type()
                ))
            })?;

        let Materialized {
            mut arguments,
            delegate_positions,
        } = materialized;
        for position in delegate_positions {
            if let Some(slot) = arguments.get_mut(position) {
                if let CallValue::Delegate(interceptor) = slot {
                    let wire = DynamicWire::for_parameter(interceptor.clone());
                    *slot = CallValue::Wire(wire);
                }
            }
        }

        let tracking_id = scope.tracking_id;
        let future = (method.handler)(MethodCall {
            instance,
            scope,
            generic_arguments,
            arguments,
        });

        if method.one_way {
            let method_key = method.key.clone();
            tokio::spawn(async move {
                if let Err(fault) = execute_guarded(future).await {
                    warn!(
                        tracking_id = %tracking_id,
                        method = %method_key,
                        error = %fault,
                        "One-way method failed"
                    );
                }
            });
            return Ok(CallValue::Unit);
        }

        execute_guarded(future).await.map_err(DispatchError::from)
    }

    fn registration(&self, interface_name: &str) -> Result<Arc<ComponentRegistration>> {
        if interface_name.is_empty() {
            return Err(DispatchError::Argument(
                "interface name is missing".to_string(),
            ));
        }
        self.host
            .registry()
            .get(interface_name)
            .ok_or_else(|| DispatchError::ComponentNotFound(interface_name.to_string()))
    }

    /// Subscribe a remote handler to an event of a Singleton component.
    ///
    /// PerCall components are wired per invocation instead, so this is a
    /// no-op for them.
    pub async fn add_event_handler(
        &self,
        interface_name: &str,
        correlation: DelegateCorrelationInfo,
    ) -> Result<()> {
        let registration = self.registration(interface_name)?;
        if registration.activation() != ActivationType::Singleton {
            return Ok(());
        }

        let instance = self.host.activator().get_instance(&registration).await?;
        let mut wirings = registration.event_wirings();
        create_wires(
            registration.interface(),
            &instance,
            std::slice::from_ref(&correlation),
            &mut wirings,
        )?;
        Ok(())
    }

    pub async fn remove_event_handler(
        &self,
        interface_name: &str,
        correlation: DelegateCorrelationInfo,
    ) -> Result<()> {
        let registration = self.registration(interface_name)?;
        if registration.activation() != ActivationType::Singleton {
            return Ok(());
        }

        let instance = self.host.activator().get_instance(&registration).await?;
        let mut wirings = registration.event_wirings();
        remove_wires(&instance, std::slice::from_ref(&correlation), &mut wirings);
        Ok(())
    }

    pub fn registered_components(&self) -> Vec<ComponentInfo> {
        self.host.registry().infos()
    }

    pub async fn logon(
        &self,
        session_id: SessionId,
        credentials: Credentials,
        ctx: &CallContext,
    ) -> Result<()> {
        self.host
            .sessions()
            .logon(session_id, credentials, ctx)
            .await
            .map(|_| ())
    }

    pub fn logoff(&self, session_id: SessionId, ctx: &CallContext) {
        self.host.sessions().logoff(session_id, ctx)
    }

    /// Extend the caller's session; returns the session age limit in minutes.
    pub fn renew_session(&self, ctx: &CallContext) -> Result<u32> {
        self.host.sessions().renew_session(ctx)
    }

    pub fn session_age_limit(&self) -> u32 {
        self.host.sessions().session_age_limit()
    }

    /// Register a remote handler for a named server notification.
    pub fn subscribe(
        &self,
        event_name: &str,
        correlation_id: CorrelationId,
        interceptor: DelegateInterceptor,
    ) -> Result<()> {
        let wire = DynamicWire::for_member(event_name, interceptor);
        self.host
            .notifications()
            .subscribe(event_name, correlation_id, wire)
    }

    pub fn unsubscribe(&self, event_name: &str, correlation_id: CorrelationId) -> Result<bool> {
        self.host
            .notifications()
            .unsubscribe(event_name, correlation_id)
    }
}
