//! Storage abstractions for the dashboard
//!
//! The facade in [`facade`] is the only entry point the rest of the service uses.
//! Adapters implement [`adapter::StorageAdapter`]; the local one sits on top of the
//! file-backed [`json_map_store::JsonMapStore`].

pub mod adapter;
pub mod json_map_store;
pub mod local;
pub mod preference;
pub mod facade;

pub use adapter::{StorageAdapter, StorageError, StorageKind, StorageResult};
pub use facade::Persistence;
pub use local::{LocalAdapter, LocalKv};
pub use preference::PreferenceStore;
