// Notification Service
// Named server events published to subscribed remote callbacks

use crate::domain::{CallValue, CorrelationId, DynamicWire};
use crate::error::{DispatchError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Default)]
pub struct NotificationService {
    running: AtomicBool,
    subscriptions: Mutex<HashMap<String, Vec<(CorrelationId, DynamicWire)>>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("Notification service started");
    }

    /// Stop accepting subscriptions. Existing ones are dropped.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("Notification service stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(DispatchError::Notification(
                "notification service is not running".to_string(),
            ))
        }
    }

    pub fn subscribe(
        &self,
        event_name: &str,
        correlation_id: CorrelationId,
        wire: DynamicWire,
    ) -> Result<()> {
        self.ensure_running()?;
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let subscribers = subscriptions.entry(event_name.to_string()).or_default();
        if subscribers.iter().any(|(id, _)| *id == correlation_id) {
            return Ok(());
        }
        subscribers.push((correlation_id, wire));
        debug!(event = %event_name, correlation_id = %correlation_id, "Subscribed");
        Ok(())
    }

    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&self, event_name: &str, correlation_id: CorrelationId) -> Result<bool> {
        self.ensure_running()?;
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(subscribers) = subscriptions.get_mut(event_name) else {
            return Ok(false);
        };
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != correlation_id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            subscriptions.remove(event_name);
        }
        Ok(removed)
    }

    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_name)
            .map_or(0, Vec::len)
    }

    /// Deliver `args` to every subscriber of `event_name`.
    ///
    /// A failing subscriber is logged and does not stop delivery to the
    /// rest. Returns the number of successful deliveries.
    pub fn publish(&self, event_name: &str, args: Vec<CallValue>) -> Result<usize> {
        self.ensure_running()?;
        let subscribers = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_name)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for (correlation_id, wire) in subscribers {
            match wire.invoke(args.clone()) {
                Ok(_) => delivered += 1,
                Err(fault) => {
                    warn!(
                        event = %event_name,
                        correlation_id = %correlation_id,
                        error = %fault,
                        "Notification delivery failed"
                    );
                }
            }
        }
        Ok(delivered)
    }
}
