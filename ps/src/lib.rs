//! pillsync - placeholder pills kept live across editor windows
//!
//! Email templates carry `<<name>>` placeholders. pillsync renders them as
//! editable pills, turns edits back into token-shaped text plus variable
//! updates, and keeps every open window of a template on the same values.
//!
//! # Core Concepts
//!
//! - **Tokens stay tokens**: extracted text never contains resolved values
//! - **Snapshots, not deltas**: windows replace their whole variable map
//! - **One sender id per window**: a window ignores its own messages
//!
//! # Modules
//!
//! - [`template`] - Placeholder tokenizer, field order, substitution
//! - [`surface`] - Pill editing surface and selection policy
//! - [`sync`] - Messages, channel client, persisted state, pin controller
//! - [`window`] - Main and popout windows composed from the above
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod surface;
pub mod sync;
pub mod template;
pub mod window;

// Re-export commonly used types
pub use config::Config;
pub use surface::{EditOutcome, Surface};
pub use sync::{Origin, SyncClient, SyncMessage, SyncPayload};
pub use window::{EditorWindow, SurfaceKind, WindowEffect, WindowRole};
