//! Cross-window synchronization
//!
//! Windows never share memory. They talk through an origin-scoped
//! broadcast topic carrying full-snapshot JSON messages, and fall back to
//! an origin-scoped key-value store for the few bits of UI state a window
//! opened later needs (pin flag, last focused variable).

mod bus;
mod client;
mod handler;
mod message;
mod pin;

use std::path::Path;
use std::sync::Arc;

use eyre::Result;
use keystore::{FileStore, KeyValueStore, MemoryStore};

pub use bus::{DEFAULT_CHANNEL_CAPACITY, SyncBus};
pub use client::{FOCUSED_VAR_KEY, FocusSnapshot, PINNED_KEY, SyncClient, SyncOptions};
pub use handler::{SyncHandler, dispatch};
pub use message::{SyncError, SyncMessage, SyncPayload, decode, encode};
pub use pin::{PinAction, PinCommand, PinController, PinDriver, PinState, PinTiming, PinTrigger, WindowFocus, WindowFocusState};

/// Topic every editor window subscribes to
pub const DEFAULT_TOPIC: &str = "email-assistant-sync";

/// Shared resources of one origin: the channel and the persisted store
#[derive(Clone)]
pub struct Origin {
    bus: Arc<SyncBus>,
    store: Arc<dyn KeyValueStore>,
}

impl Origin {
    pub fn new(bus: Arc<SyncBus>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { bus, store }
    }

    /// Origin backed by memory only
    pub fn in_memory(topic: &str) -> Self {
        Self::new(
            Arc::new(SyncBus::new(topic, DEFAULT_CHANNEL_CAPACITY)),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Origin whose store lives under `store_dir`, with a fresh channel
    pub fn open(store_dir: impl AsRef<Path>, origin: &str, topic: &str, capacity: usize) -> Result<Self> {
        let store = FileStore::open(store_dir, origin)?;
        Ok(Self::new(Arc::new(SyncBus::new(topic, capacity)), Arc::new(store)))
    }

    pub fn bus(&self) -> &Arc<SyncBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }
}

impl std::fmt::Debug for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Origin").field("topic", &self.bus.topic()).finish_non_exhaustive()
    }
}
