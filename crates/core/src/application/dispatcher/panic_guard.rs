// Panic isolation for component methods

use crate::domain::{CallValue, MethodFuture};
use crate::error::InvocationFault;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Await a method future, turning a panic into an invocation fault.
///
/// A panicking component must not take the dispatcher task down with it;
/// the caller sees a fault of kind `Panic` instead.
pub async fn execute_guarded(future: MethodFuture) -> Result<CallValue, InvocationFault> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(panic_msg = %panic_msg, "Component method panicked");
            Err(InvocationFault::new("Panic", panic_msg))
        }
    }
}
