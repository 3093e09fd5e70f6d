// Per-call cleanup that survives the caller dropping the invocation future

use crate::application::host::ComponentHost;
use crate::application::wiring::remove_wires;
use crate::domain::{ComponentInstance, ComponentRegistration, DelegateCorrelationInfo, WiringTable};
use crate::error::DispatchError;
use crate::port::{InvokeCanceledArgs, TransactionScope};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub(super) const ABANDONED_MESSAGE: &str = "the caller abandoned the call";

/// A PerCall instance together with the wires made for this call
pub(super) struct PerCallLease {
    pub(super) instance: Arc<ComponentInstance>,
    pub(super) correlations: Vec<DelegateCorrelationInfo>,
    pub(super) wirings: WiringTable,
}

impl PerCallLease {
    fn unwire(&mut self) {
        remove_wires(&self.instance, &self.correlations, &mut self.wirings);
    }
}

/// Owns everything a call must give back: the joined transaction scope
/// and, for PerCall components, the instance and its wiring.
///
/// `finish` completes both on the normal path. If the guard is dropped
/// first, the wiring is removed on the spot and the rollback and release
/// are spawned onto the current runtime.
pub(super) struct CallCleanup {
    host: Arc<ComponentHost>,
    tracking_id: Uuid,
    registration: Arc<ComponentRegistration>,
    transaction: Option<Box<dyn TransactionScope>>,
    lease: Option<PerCallLease>,
}

impl CallCleanup {
    pub(super) fn new(
        host: Arc<ComponentHost>,
        tracking_id: Uuid,
        registration: Arc<ComponentRegistration>,
        transaction: Option<Box<dyn TransactionScope>>,
    ) -> Self {
        Self {
            host,
            tracking_id,
            registration,
            transaction,
            lease: None,
        }
    }

    /// Take ownership of a PerCall instance; it is released on every exit path.
    pub(super) fn lease(
        &mut self,
        instance: Arc<ComponentInstance>,
        correlations: Vec<DelegateCorrelationInfo>,
    ) -> &mut PerCallLease {
        self.lease.insert(PerCallLease {
            instance,
            correlations,
            wirings: WiringTable::new(),
        })
    }

    /// Commit or roll back, then unwire and release. Defuses the guard.
    pub(super) async fn finish(mut self, success: bool) {
        if let Some(scope) = self.transaction.take() {
            complete_scope(self.tracking_id, scope, success).await;
        }
        if let Some(mut lease) = self.lease.take() {
            lease.unwire();
            release_instance(&self.host, self.tracking_id, &self.registration, lease.instance).await;
        }
    }
}

impl Drop for CallCleanup {
    fn drop(&mut self) {
        let transaction = self.transaction.take();
        let lease = self.lease.take();
        if transaction.is_none() && lease.is_none() {
            return;
        }

        let tracking_id = self.tracking_id;
        warn!(
            tracking_id = %tracking_id,
            component = %self.registration.unique_name(),
            "Call dropped before completion, rolling back and releasing"
        );

        let instance = lease.map(|mut lease| {
            lease.unwire();
            lease.instance
        });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(
                tracking_id = %tracking_id,
                "No runtime available to finish cleanup of a dropped call"
            );
            return;
        };

        let host = Arc::clone(&self.host);
        let registration = Arc::clone(&self.registration);
        runtime.spawn(async move {
            if let Some(scope) = transaction {
                complete_scope(tracking_id, scope, false).await;
            }
            if let Some(instance) = instance {
                release_instance(&host, tracking_id, &registration, instance).await;
            }
        });
    }
}

/// Emits exactly one call-canceled notification if the invocation future
/// is dropped while still armed.
pub(super) struct CancelOnDrop<'a> {
    host: &'a ComponentHost,
    tracking_id: Uuid,
    armed: bool,
}

impl<'a> CancelOnDrop<'a> {
    pub(super) fn new(host: &'a ComponentHost, tracking_id: Uuid) -> Self {
        Self {
            host,
            tracking_id,
            armed: true,
        }
    }

    pub(super) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let error = DispatchError::InvokeCanceled(ABANDONED_MESSAGE.to_string());
        info!(tracking_id = %self.tracking_id, error = %error, "Call canceled");
        self.host.observers().invoke_canceled(&InvokeCanceledArgs {
            tracking_id: self.tracking_id,
            error: &error,
        });
    }
}

async fn complete_scope(tracking_id: Uuid, scope: Box<dyn TransactionScope>, success: bool) {
    let result = if success {
        scope.commit().await
    } else {
        scope.rollback().await
    };
    if let Err(error) = result {
        warn!(
            tracking_id = %tracking_id,
            commit = success,
            error = %error,
            "Failed to complete transaction scope"
        );
    }
}

async fn release_instance(
    host: &ComponentHost,
    tracking_id: Uuid,
    registration: &ComponentRegistration,
    instance: Arc<ComponentInstance>,
) {
    if let Err(error) = host
        .activator()
        .release_instance(registration, instance)
        .await
    {
        warn!(
            tracking_id = %tracking_id,
            component = %registration.unique_name(),
            error = %error,
            "Failed to release component instance"
        );
    }
}
