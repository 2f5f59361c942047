//! Inter-window message types
//!
//! JSON objects discriminated on `type`, with camelCase field names. Every
//! message carries the sender id and a timestamp; `seq` and `templateId`
//! are optional so peers that never send them still decode.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use varkit::VariableMap;

/// Errors crossing the channel boundary
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to decode sync message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode sync message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Sync channel closed")]
    Closed,
}

/// Envelope shared by every message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncMessage {
    #[serde(rename = "senderId", alias = "sender")]
    pub sender_id: String,

    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,

    /// Per-sender sequence number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,

    #[serde(rename = "templateId", default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(flatten)]
    pub payload: SyncPayload,
}

/// One payload shape per message type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncPayload {
    /// A window moved focus to a variable (`None` clears)
    #[serde(rename_all = "camelCase")]
    FocusedVar {
        var_name: Option<String>,
        normalized_var: Option<String>,
    },

    /// Pointer entered or left a variable
    #[serde(rename_all = "camelCase")]
    VariableHovered { var_name: Option<String> },

    /// A value changed; `all_variables` is the sender's full snapshot
    #[serde(rename_all = "camelCase")]
    VariableChanged {
        var_name: String,
        #[serde(default)]
        value: String,
        #[serde(default, with = "varkit::lenient")]
        all_variables: VariableMap,
    },

    #[serde(rename_all = "camelCase")]
    VariableRemoved {
        var_name: String,
        #[serde(default, with = "varkit::lenient")]
        all_variables: VariableMap,
    },

    /// A value was reset to its sample; older peers omit the snapshot
    #[serde(rename_all = "camelCase")]
    VariableReinitialized {
        var_name: String,
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none", with = "varkit::lenient::option")]
        all_variables: Option<VariableMap>,
    },

    /// Initial push from the main window to an attaching popout
    VariablesUpdated {
        #[serde(default, with = "varkit::lenient")]
        variables: VariableMap,
    },

    SyncComplete {
        #[serde(default, with = "varkit::lenient")]
        variables: VariableMap,
    },
}

impl SyncPayload {
    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            SyncPayload::FocusedVar { .. } => "focusedVar",
            SyncPayload::VariableHovered { .. } => "variableHovered",
            SyncPayload::VariableChanged { .. } => "variableChanged",
            SyncPayload::VariableRemoved { .. } => "variableRemoved",
            SyncPayload::VariableReinitialized { .. } => "variableReinitialized",
            SyncPayload::VariablesUpdated { .. } => "variablesUpdated",
            SyncPayload::SyncComplete { .. } => "syncComplete",
        }
    }

    /// Full snapshot carried by this payload, if any
    pub fn snapshot(&self) -> Option<&VariableMap> {
        match self {
            SyncPayload::VariableChanged { all_variables, .. } | SyncPayload::VariableRemoved { all_variables, .. } => {
                Some(all_variables)
            }
            SyncPayload::VariableReinitialized { all_variables, .. } => all_variables.as_ref(),
            SyncPayload::VariablesUpdated { variables } | SyncPayload::SyncComplete { variables } => Some(variables),
            SyncPayload::FocusedVar { .. } | SyncPayload::VariableHovered { .. } => None,
        }
    }
}

/// Parse one message from its JSON text
pub fn decode(json: &str) -> Result<SyncMessage, SyncError> {
    serde_json::from_str(json).map_err(SyncError::Decode)
}

/// Serialize one message to JSON text
pub fn encode(message: &SyncMessage) -> Result<String, SyncError> {
    serde_json::to_string(message).map_err(SyncError::Encode)
}
