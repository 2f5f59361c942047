//! Sync client: one window's end of the channel

use std::collections::HashMap;

use chrono::Utc;
use keystore::{get_json, set_json};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use varkit::normalize_var_key;

use super::Origin;
use super::message::{SyncError, SyncMessage, SyncPayload, decode, encode};

/// Persisted pin flag (`"true"` / `"false"`)
pub const PINNED_KEY: &str = "ea_popout_pinned";

/// Persisted last focus, a [`FocusSnapshot`]
pub const FOCUSED_VAR_KEY: &str = "ea_focused_var";

/// Last focus event, persisted for windows that open later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    #[serde(default)]
    pub focused_var: Option<String>,
    #[serde(default)]
    pub normalized_var: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub sender: String,
}

/// Client behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Key persisted focus and pin state by template id
    pub namespace_by_template: bool,
    /// Drop messages whose `seq` is not newer than the last one seen from that sender
    pub discard_stale: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            namespace_by_template: true,
            discard_stale: true,
        }
    }
}

/// One window's subscription, identity and persisted state access
///
/// Inbound messages are validated and filtered before they reach a
/// handler: undecodable text, the window's own messages, messages for
/// another template and stale sequence numbers are dropped.
pub struct SyncClient {
    origin: Origin,
    sender_id: String,
    template_id: Option<String>,
    options: SyncOptions,
    rx: Option<broadcast::Receiver<String>>,
    seq: u64,
    last_seen: HashMap<String, u64>,
}

impl SyncClient {
    /// Subscribe to the origin's topic with a fresh sender id
    pub fn connect(origin: &Origin, template_id: Option<&str>, options: SyncOptions) -> Self {
        let sender_id = Uuid::now_v7().to_string();
        info!(%sender_id, topic = origin.bus().topic(), ?template_id, "SyncClient::connect");
        Self {
            origin: origin.clone(),
            rx: Some(origin.bus().subscribe()),
            sender_id,
            template_id: template_id.map(str::to_string),
            options,
            seq: 0,
            last_seen: HashMap::new(),
        }
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    /// Publish `payload`; failures are logged and reported as `false`
    pub fn send(&mut self, payload: SyncPayload) -> bool {
        if self.rx.is_none() {
            warn!(kind = payload.kind(), "SyncClient::send: client closed, dropping message");
            return false;
        }
        self.seq += 1;
        let message = SyncMessage {
            sender_id: self.sender_id.clone(),
            timestamp: Utc::now().timestamp_millis(),
            seq: Some(self.seq),
            template_id: self.template_id.clone(),
            payload,
        };
        match encode(&message) {
            Ok(json) => {
                let reached = self.origin.bus().publish(json);
                debug!(kind = message.payload.kind(), seq = self.seq, reached, "SyncClient::send");
                true
            }
            Err(e) => {
                warn!(error = %e, "SyncClient::send: failed to encode message");
                false
            }
        }
    }

    /// Validate one inbound message; `None` when it must be ignored
    fn accept(&mut self, json: &str) -> Option<SyncMessage> {
        let message = match decode(json) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "SyncClient::accept: dropping invalid message");
                return None;
            }
        };
        if message.sender_id == self.sender_id {
            trace!(kind = message.payload.kind(), "SyncClient::accept: own message");
            return None;
        }
        if let (Some(mine), Some(theirs)) = (&self.template_id, &message.template_id)
            && mine != theirs
        {
            debug!(%theirs, "SyncClient::accept: message for another template");
            return None;
        }
        if self.options.discard_stale
            && let Some(seq) = message.seq
        {
            let last = self.last_seen.entry(message.sender_id.clone()).or_insert(0);
            if seq <= *last {
                debug!(sender = %message.sender_id, seq, last = *last, "SyncClient::accept: stale message");
                return None;
            }
            *last = seq;
        }
        Some(message)
    }

    /// Drain every message already delivered, without waiting
    pub fn poll(&mut self) -> Vec<SyncMessage> {
        let mut raw = Vec::new();
        if let Some(rx) = self.rx.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(json) => raw.push(json),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "SyncClient::poll: subscriber lagged, messages lost");
                    }
                }
            }
        }
        raw.iter().filter_map(|json| self.accept(json)).collect()
    }

    /// Wait for the next accepted message
    pub async fn recv(&mut self) -> Result<SyncMessage, SyncError> {
        loop {
            let Some(rx) = self.rx.as_mut() else {
                return Err(SyncError::Closed);
            };
            let json = match rx.recv().await {
                Ok(json) => json,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SyncClient::recv: subscriber lagged, messages lost");
                    continue;
                }
                Err(RecvError::Closed) => return Err(SyncError::Closed),
            };
            if let Some(message) = self.accept(&json) {
                return Ok(message);
            }
        }
    }

    /// Store key, suffixed with the template id when namespacing is on
    pub fn store_key(&self, base: &str) -> String {
        match (&self.template_id, self.options.namespace_by_template) {
            (Some(id), true) => format!("{base}:{id}"),
            _ => base.to_string(),
        }
    }

    /// Persist the focused variable for windows opened later
    pub fn persist_focus(&self, var_name: Option<&str>) {
        let normalized = var_name.map(normalize_var_key).filter(|k| !k.is_empty());
        let snapshot = FocusSnapshot {
            focused_var: var_name.map(str::to_string),
            normalized_var: normalized,
            timestamp: Utc::now().timestamp_millis(),
            sender: self.sender_id.clone(),
        };
        let key = self.store_key(FOCUSED_VAR_KEY);
        if let Err(e) = set_json(self.origin.store().as_ref(), &key, &snapshot) {
            warn!(%key, error = %e, "SyncClient::persist_focus: unable to persist focus");
        }
    }

    /// Last persisted focus event, if readable
    pub fn last_focus(&self) -> Option<FocusSnapshot> {
        let key = self.store_key(FOCUSED_VAR_KEY);
        match get_json(self.origin.store().as_ref(), &key) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(%key, error = %e, "SyncClient::last_focus: unable to read focus");
                None
            }
        }
    }

    pub fn persist_pinned(&self, pinned: bool) {
        let key = self.store_key(PINNED_KEY);
        let value = if pinned { "true" } else { "false" };
        if let Err(e) = self.origin.store().set(&key, value) {
            warn!(%key, error = %e, "SyncClient::persist_pinned: unable to persist pin state");
        }
    }

    /// Persisted pin flag; anything but `"true"` reads as unpinned
    pub fn load_pinned(&self) -> bool {
        let key = self.store_key(PINNED_KEY);
        match self.origin.store().get(&key) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(%key, error = %e, "SyncClient::load_pinned: unable to read pin state");
                false
            }
        }
    }

    /// Drop the subscription; later sends are no-ops
    pub fn close(&mut self) {
        if self.rx.take().is_some() {
            info!(sender_id = %self.sender_id, "SyncClient::close");
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.close();
    }
}
