// Delegate/event wiring between server slots and remote callbacks

use crate::domain::{
    ComponentInstance, DelegateCorrelationInfo, DynamicWire, InterfaceDescriptor, WiringTable,
};
use crate::error::{DispatchError, Result};
use tracing::debug;

/// Bind every correlation not yet present in `table` onto `instance`.
///
/// All slot names are checked before anything is attached, so an unknown
/// slot leaves the instance untouched. Returns the number of new wires.
pub fn create_wires(
    interface: &InterfaceDescriptor,
    instance: &ComponentInstance,
    correlations: &[DelegateCorrelationInfo],
    table: &mut WiringTable,
) -> Result<usize> {
    for correlation in correlations {
        interface
            .require_slot(&correlation.member_name, correlation.is_event)
            .map_err(|e| DispatchError::Argument(e.to_string()))?;
    }

    let mut created = 0;
    for correlation in correlations {
        if table.contains(&correlation.correlation_id) {
            continue;
        }

        let wire = DynamicWire::for_member(
            correlation.member_name.clone(),
            correlation.interceptor.clone(),
        );
        if correlation.is_event {
            instance
                .slots()
                .attach_event(&correlation.member_name, wire.clone());
        } else {
            instance
                .slots()
                .set_delegate(&correlation.member_name, Some(wire.clone()));
        }

        debug!(
            correlation_id = %correlation.correlation_id,
            member = %correlation.member_name,
            is_event = correlation.is_event,
            instance_id = %instance.id(),
            "Wire created"
        );
        table.insert(correlation.correlation_id, wire);
        created += 1;
    }
    Ok(created)
}

/// Undo `create_wires` for the given correlations.
///
/// Delegate properties are cleared even if the correlation was never wired.
/// Returns the number of table entries removed.
pub fn remove_wires(
    instance: &ComponentInstance,
    correlations: &[DelegateCorrelationInfo],
    table: &mut WiringTable,
) -> usize {
    let mut removed = 0;
    for correlation in correlations {
        let wire = table.remove(&correlation.correlation_id);

        if correlation.is_event {
            if let Some(wire) = &wire {
                instance
                    .slots()
                    .detach_event(&correlation.member_name, wire.id());
            }
        } else {
            instance.slots().set_delegate(&correlation.member_name, None);
        }

        if wire.is_some() {
            removed += 1;
            debug!(
                correlation_id = %correlation.correlation_id,
                member = %correlation.member_name,
                instance_id = %instance.id(),
                "Wire removed"
            );
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallValue, DelegateInterceptor};
    use crate::port::callback_sink::mocks::RecordingCallbackSink;
    use std::sync::Arc;
    use uuid::Uuid;

    fn interface() -> InterfaceDescriptor {
        InterfaceDescriptor::new("IMonitor")
            .event("Changed")
            .delegate("OnAlarm")
    }

    fn interceptor(sink: &Arc<RecordingCallbackSink>) -> DelegateInterceptor {
        DelegateInterceptor::new(Uuid::new_v4(), sink.clone())
    }

    #[test]
    fn test_create_twice_equals_once() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let instance = ComponentInstance::new(());
        let mut table = WiringTable::new();
        let correlations = vec![DelegateCorrelationInfo::event("Changed", interceptor(&sink))];

        assert_eq!(create_wires(&interface(), &instance, &correlations, &mut table).unwrap(), 1);
        assert_eq!(create_wires(&interface(), &instance, &correlations, &mut table).unwrap(), 0);

        assert_eq!(instance.slots().event_handler_count("Changed"), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_raised_event_reaches_remote_handler() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let instance = ComponentInstance::new(());
        let mut table = WiringTable::new();
        let handler = interceptor(&sink);
        let correlations = vec![DelegateCorrelationInfo::event("Changed", handler.clone())];
        create_wires(&interface(), &instance, &correlations, &mut table).unwrap();

        instance.slots().raise("Changed", vec![CallValue::data(serde_json::json!(1))]);

        let deliveries = sink.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].handle, handler.handle());
        assert_eq!(deliveries[0].member.as_deref(), Some("Changed"));
    }

    #[test]
    fn test_unknown_slot_attaches_nothing() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let instance = ComponentInstance::new(());
        let mut table = WiringTable::new();
        let correlations = vec![
            DelegateCorrelationInfo::event("Changed", interceptor(&sink)),
            DelegateCorrelationInfo::delegate("Missing", interceptor(&sink)),
        ];

        let err = create_wires(&interface(), &instance, &correlations, &mut table).unwrap_err();
        assert!(matches!(err, DispatchError::Argument(_)));
        assert!(instance.slots().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_detaches_and_clears() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let instance = ComponentInstance::new(());
        let mut table = WiringTable::new();
        let correlations = vec![
            DelegateCorrelationInfo::event("Changed", interceptor(&sink)),
            DelegateCorrelationInfo::delegate("OnAlarm", interceptor(&sink)),
        ];
        create_wires(&interface(), &instance, &correlations, &mut table).unwrap();
        assert!(instance.slots().delegate("OnAlarm").is_some());

        assert_eq!(remove_wires(&instance, &correlations, &mut table), 2);
        assert!(instance.slots().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_clears_delegate_never_wired_here() {
        let sink = Arc::new(RecordingCallbackSink::new());
        let instance = ComponentInstance::new(());
        instance.slots().set_delegate(
            "OnAlarm",
            Some(DynamicWire::for_member("OnAlarm", interceptor(&sink))),
        );

        let mut table = WiringTable::new();
        let correlations = vec![DelegateCorrelationInfo::delegate("OnAlarm", interceptor(&sink))];
        assert_eq!(remove_wires(&instance, &correlations, &mut table), 0);
        assert!(instance.slots().delegate("OnAlarm").is_none());
    }
}
