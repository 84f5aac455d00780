//! Persistence layer for the profile store
//!
//! - **kv**: injected key-value adapters (in-memory, JSON file)
//! - **codec**: profile list encoding, structured and legacy line formats
//! - **migrate**: one-time copy of renamed setting keys
//! - **settings**: scalar settings of the active connection

pub mod codec;
pub mod kv;
pub mod migrate;
pub mod settings;

// Re-export commonly used types
pub use codec::{Decoded, SourceFormat};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use settings::{ActiveConnection, Setting};
