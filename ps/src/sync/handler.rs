//! Typed handler table for inbound messages

use tracing::debug;
use varkit::VariableMap;

use super::message::{SyncMessage, SyncPayload};

/// One method per message type; every method defaults to ignoring it
pub trait SyncHandler {
    fn on_focused_var(&mut self, _var_name: Option<&str>, _normalized_var: Option<&str>) {}

    fn on_variable_hovered(&mut self, _var_name: Option<&str>) {}

    fn on_variable_changed(&mut self, _var_name: &str, _value: &str, _all_variables: &VariableMap) {}

    fn on_variable_removed(&mut self, _var_name: &str, _all_variables: &VariableMap) {}

    fn on_variable_reinitialized(&mut self, _var_name: &str, _value: &str, _all_variables: Option<&VariableMap>) {}

    fn on_variables_updated(&mut self, _variables: &VariableMap) {}

    /// Same as a `variablesUpdated` snapshot unless overridden
    fn on_sync_complete(&mut self, variables: &VariableMap) {
        self.on_variables_updated(variables);
    }
}

/// Route `message` to the matching handler method
pub fn dispatch<H: SyncHandler + ?Sized>(handler: &mut H, message: &SyncMessage) {
    debug!(kind = message.payload.kind(), sender = %message.sender_id, "dispatch");
    match &message.payload {
        SyncPayload::FocusedVar {
            var_name,
            normalized_var,
        } => handler.on_focused_var(var_name.as_deref(), normalized_var.as_deref()),
        SyncPayload::VariableHovered { var_name } => handler.on_variable_hovered(var_name.as_deref()),
        SyncPayload::VariableChanged {
            var_name,
            value,
            all_variables,
        } => handler.on_variable_changed(var_name, value, all_variables),
        SyncPayload::VariableRemoved { var_name, all_variables } => handler.on_variable_removed(var_name, all_variables),
        SyncPayload::VariableReinitialized {
            var_name,
            value,
            all_variables,
        } => handler.on_variable_reinitialized(var_name, value, all_variables.as_ref()),
        SyncPayload::VariablesUpdated { variables } => handler.on_variables_updated(variables),
        SyncPayload::SyncComplete { variables } => handler.on_sync_complete(variables),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl SyncHandler for Recorder {
        fn on_focused_var(&mut self, var_name: Option<&str>, _normalized_var: Option<&str>) {
            self.calls.push(format!("focus:{}", var_name.unwrap_or("-")));
        }

        fn on_variables_updated(&mut self, variables: &VariableMap) {
            self.calls.push(format!("snapshot:{}", variables.len()));
        }
    }

    fn message(payload: SyncPayload) -> SyncMessage {
        SyncMessage {
            sender_id: "peer".to_string(),
            timestamp: 0,
            seq: None,
            template_id: None,
            payload,
        }
    }

    #[test]
    fn test_dispatch_routes_by_type() {
        let mut recorder = Recorder::default();
        let variables: VariableMap = [("a".to_string(), "1".to_string())].into();

        dispatch(
            &mut recorder,
            &message(SyncPayload::FocusedVar {
                var_name: Some("a".to_string()),
                normalized_var: Some("a".to_string()),
            }),
        );
        dispatch(&mut recorder, &message(SyncPayload::SyncComplete { variables }));
        dispatch(&mut recorder, &message(SyncPayload::VariableHovered { var_name: None }));

        assert_eq!(recorder.calls, vec!["focus:a", "snapshot:1"]);
    }
}
