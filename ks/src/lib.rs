//! keystore - origin-scoped persistent key-value store
//!
//! Every editor window of one origin shares a small string-valued store.
//! It holds best-effort UI affinity state (pin flag, last focused variable),
//! never authoritative variable values, so there is no locking: the last
//! writer wins.
//!
//! # Layout
//!
//! ```text
//! {store_dir}/
//! ├── default.json      # one JSON object per origin
//! └── staging.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keystore::{FileStore, KeyValueStore};
//!
//! let store = FileStore::open("/tmp/store", "default")?;
//! store.set("ea_popout_pinned", "true")?;
//! assert_eq!(store.get("ea_popout_pinned")?.as_deref(), Some("true"));
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, get_json, set_json};

/// Origin used when none is configured
pub const DEFAULT_ORIGIN: &str = "default";
