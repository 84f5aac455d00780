//! Key-value persistence adapters
//!
//! The store never touches files directly; it talks to an injected
//! [`KeyValueStore`]. [`KeyValueStore::contains`] reports whether a key was
//! ever written, whatever its type, which is how "unset" is told apart from
//! "set to empty".

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::PersistenceError;

/// Durable string/int/bool key-value storage.
///
/// Implementations serialize access per key; there is no atomicity across keys.
pub trait KeyValueStore {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_int(&self, key: &str, value: i64) -> Result<(), PersistenceError>;

    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PersistenceError>;

    /// Drop `key` entirely so later reads see it as never set
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;

    /// Whether `key` was ever written, whatever its type
    fn contains(&self, key: &str) -> bool;

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get_string(&self, key: &str) -> Option<String> {
        (**self).get_string(key)
    }
    fn set_string(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set_string(key, value)
    }
    fn get_int(&self, key: &str) -> Option<i64> {
        (**self).get_int(key)
    }
    fn set_int(&self, key: &str, value: i64) -> Result<(), PersistenceError> {
        (**self).set_int(key, value)
    }
    fn get_bool(&self, key: &str) -> Option<bool> {
        (**self).get_bool(key)
    }
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PersistenceError> {
        (**self).set_bool(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        (**self).remove(key)
    }
    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }
}

/// Typed values stored under a key
type Entries = BTreeMap<String, Value>;

/// Numbers and bools written by older builds read back as their text form
fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    value.as_i64()
}

fn as_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

/// Process-local store, used as the fake in tests and for embedders
/// that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn get_with<T>(&self, key: &str, convert: fn(&Value) -> Option<T>) -> Option<T> {
        self.entries.lock().get(key).and_then(convert)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get_with(key, as_string)
    }
    fn set_string(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.set(key, Value::from(value))
    }
    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_with(key, as_int)
    }
    fn set_int(&self, key: &str, value: i64) -> Result<(), PersistenceError> {
        self.set(key, Value::from(value))
    }
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_with(key, as_bool)
    }
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PersistenceError> {
        self.set(key, Value::from(value))
    }
    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().remove(key);
        Ok(())
    }
    fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

/// All keys persisted as one pretty-printed JSON object.
///
/// Every read goes to disk. Writes re-read the file, update one key and
/// write it back under a process-local lock.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<platform config dir>/tunnel-profiles/settings.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as empty; unreadable or corrupt file is an error
    fn load(&self) -> Result<Entries, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&contents).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn get_with<T>(&self, key: &str, convert: fn(&Value) -> Option<T>) -> Option<T> {
        match self.load() {
            Ok(entries) => {
                let value = entries.get(key).and_then(convert);
                debug!(key = %key, found = value.is_some(), "Read setting");
                value
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Settings unreadable, treating key as unset");
                None
            }
        }
    }

    fn update(&self, key: &str, value: Option<Value>) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        match value {
            Some(value) => entries.insert(key.to_string(), value),
            None => entries.remove(key),
        };
        self.write(&entries)
    }

    fn write(&self, entries: &Entries) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path.display(), keys = entries.len(), "Saved settings");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get_with(key, as_string)
    }
    fn set_string(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.update(key, Some(Value::from(value)))
    }
    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_with(key, as_int)
    }
    fn set_int(&self, key: &str, value: i64) -> Result<(), PersistenceError> {
        self.update(key, Some(Value::from(value)))
    }
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_with(key, as_bool)
    }
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PersistenceError> {
        self.update(key, Some(Value::from(value)))
    }
    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.update(key, None)
    }
    fn contains(&self, key: &str) -> bool {
        match self.load() {
            Ok(entries) => entries.contains_key(key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Settings unreadable, treating key as unset");
                false
            }
        }
    }
}
