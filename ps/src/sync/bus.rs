//! Sync Bus - one topic's publish/subscribe channel
//!
//! Carries JSON text so every subscriber decodes and validates at its own
//! boundary, like a browser broadcast channel does. Windows of one origin
//! share a bus through [`super::Origin`].

use tokio::sync::broadcast;
use tracing::debug;

use super::DEFAULT_TOPIC;

/// Default channel capacity (messages)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Publish/subscribe channel for one topic
pub struct SyncBus {
    topic: String,
    tx: broadcast::Sender<String>,
}

impl SyncBus {
    /// Create a bus for `topic` buffering up to `capacity` messages per subscriber
    pub fn new(topic: impl Into<String>, capacity: usize) -> Self {
        let topic = topic.into();
        debug!(%topic, capacity, "SyncBus::new: creating sync bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { topic, tx }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish a message to every subscriber, the sender included
    ///
    /// Returns the number of subscribers reached; zero when nobody listens.
    pub fn publish(&self, json: String) -> usize {
        debug!(topic = %self.topic, bytes = json.len(), "SyncBus::publish");
        self.tx.send(json).unwrap_or(0)
    }

    /// Subscribe to messages published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        debug!(topic = %self.topic, "SyncBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC, DEFAULT_CHANNEL_CAPACITY)
    }
}
