//! Server profile storage for a proxy client
//!
//! Saved profiles (name, host, credential) and the scalar settings of the
//! active connection live in an injected key-value store. See
//! [`store::ProfileStore`] for the operations exposed to a front end.

#![forbid(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod profile;
pub mod store;

pub use config::{ActiveConnection, JsonFileStore, KeyValueStore, MemoryStore, Setting};
pub use error::{PersistenceError, StoreError, StoreResult, ValidationError};
pub use host::parse_host;
pub use profile::{ProfileList, ServerProfile};
pub use store::{ImportReport, ProfileStore};
