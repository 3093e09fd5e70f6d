//! Shared fixtures: a calculator component on a host wired with the
//! in-memory adapters.

#![allow(dead_code)]

use chrono::Utc;
use remora_core::domain::types::type_list;
use remora_core::domain::{
    CallContext, CallValue, ComponentRegistration, InterfaceDescriptor, InvocationRequest,
    MethodCall, SessionId,
};
use remora_core::error::InvocationFault;
use remora_core::port::authentication::mocks::StaticCredentialsProvider;
use remora_core::port::observer::mocks::RecordingObserver;
use remora_core::port::time_provider::mocks::ManualClock;
use remora_core::port::{Credentials, SessionStore};
use remora_core::{ComponentHost, Dispatcher};
use remora_infra_memory::{InMemoryActivator, InMemorySessionStore, InMemoryTransactionCoordinator};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const SESSION_AGE_MINUTES: u32 = 20;

/// Calculator state; `Accumulate` adds to it
#[derive(Default)]
pub struct Calc {
    pub total: AtomicI64,
}

pub fn calc_interface() -> InterfaceDescriptor {
    InterfaceDescriptor::new("ICalc")
        .method("Add", type_list(["int", "int"]), |call: MethodCall| async move {
            let sum = call.i64_arg(0)? + call.i64_arg(1)?;
            Ok::<_, InvocationFault>(CallValue::data(json!(sum)))
        })
        .method("Accumulate", type_list(["int"]), |call: MethodCall| async move {
            let amount = call.i64_arg(0)?;
            let calc = call
                .state::<Calc>()
                .ok_or_else(|| InvocationFault::message("calculator state missing"))?;
            let total = calc.total.fetch_add(amount, Ordering::SeqCst) + amount;
            call.instance
                .slots()
                .raise("TotalChanged", vec![CallValue::data(json!(total))]);
            Ok::<_, InvocationFault>(CallValue::data(json!(total)))
        })
        .method("Divide", type_list(["int", "int"]), |call: MethodCall| async move {
            let divisor = call.i64_arg(1)?;
            if divisor == 0 {
                return Err(InvocationFault::new("DivideByZero", "cannot divide by zero"));
            }
            Ok::<_, InvocationFault>(CallValue::data(json!(call.i64_arg(0)? / divisor)))
        })
        .method("Report", vec![], |call: MethodCall| async move {
            let reply = call
                .instance
                .slots()
                .invoke_delegate("OnReport", vec![CallValue::data(json!("report"))]);
            Ok::<_, InvocationFault>(match reply {
                Some(result) => result?,
                None => CallValue::data(json!("no listener")),
            })
        })
        .method("Stall", type_list(["int"]), |call: MethodCall| async move {
            let millis = call.i64_arg(0)?;
            tokio::time::sleep(Duration::from_millis(millis.unsigned_abs())).await;
            Ok::<_, InvocationFault>(CallValue::Unit)
        })
        .event("TotalChanged")
        .delegate("OnReport")
}

pub struct TestHost {
    pub dispatcher: Dispatcher,
    pub observer: Arc<RecordingObserver>,
    pub activator: Arc<InMemoryActivator>,
    pub transactions: Arc<InMemoryTransactionCoordinator>,
    pub clock: Arc<ManualClock>,
}

/// Host with ICalc registered under the given registration
pub fn host_with(registration: ComponentRegistration) -> TestHost {
    let observer = Arc::new(RecordingObserver::new());
    let activator = Arc::new(InMemoryActivator::new());
    let transactions = Arc::new(InMemoryTransactionCoordinator::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(SESSION_AGE_MINUTES));

    let host = ComponentHost::builder("integration")
        .activator(activator.clone())
        .session_store(store)
        .authentication_provider(Arc::new(StaticCredentialsProvider::new([("alice", "secret")])))
        .time_provider(clock.clone())
        .transaction_coordinator(transactions.clone())
        .observer(observer.clone())
        .with_notifications()
        .build()
        .unwrap();
    host.register_component(registration).unwrap();

    TestHost {
        dispatcher: Dispatcher::new(Arc::new(host)),
        observer,
        activator,
        transactions,
        clock,
    }
}

pub fn per_call_host() -> TestHost {
    host_with(ComponentRegistration::per_call(calc_interface(), Calc::default))
}

pub fn singleton_host() -> TestHost {
    host_with(ComponentRegistration::singleton(calc_interface(), Calc::default))
}

pub fn alice() -> Credentials {
    Credentials::from([
        ("username".to_string(), "alice".to_string()),
        ("password".to_string(), "secret".to_string()),
    ])
}

pub async fn logged_on(host: &TestHost) -> SessionId {
    let session = SessionId::new_v4();
    host.dispatcher
        .logon(session, alice(), &CallContext::for_session(session))
        .await
        .unwrap();
    session
}

pub fn add(a: i64, b: i64) -> InvocationRequest {
    InvocationRequest::new(Uuid::new_v4(), "ICalc", "Add")
        .with_argument("int", CallValue::data(json!(a)))
        .with_argument("int", CallValue::data(json!(b)))
}

pub fn accumulate(amount: i64) -> InvocationRequest {
    InvocationRequest::new(Uuid::new_v4(), "ICalc", "Accumulate")
        .with_argument("int", CallValue::data(json!(amount)))
}

pub fn stall(millis: i64) -> InvocationRequest {
    InvocationRequest::new(Uuid::new_v4(), "ICalc", "Stall")
        .with_argument("int", CallValue::data(json!(millis)))
}
