//! Copy values from renamed setting keys into their current names

use tracing::{debug, info};

use super::kv::KeyValueStore;
use crate::constants::legacy::KEY_RENAMES;
use crate::error::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Copied,
    /// New key already holds a value (possibly empty); left alone
    AlreadySet,
    /// Old key absent or empty
    NothingToMigrate,
}

/// Copy `old_key` into `new_key` unless `new_key` was ever written.
///
/// The old key is kept so an older build still finds its data.
pub fn migrate_key(
    kv: &impl KeyValueStore,
    old_key: &str,
    new_key: &str,
) -> Result<MigrationOutcome, PersistenceError> {
    let old_value = match kv.get_string(old_key) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(MigrationOutcome::NothingToMigrate),
    };

    if kv.contains(new_key) {
        debug!(old = %old_key, new = %new_key, "New key already set, skipping migration");
        return Ok(MigrationOutcome::AlreadySet);
    }

    kv.set_string(new_key, &old_value)?;
    info!(old = %old_key, new = %new_key, "Migrated legacy setting");
    Ok(MigrationOutcome::Copied)
}

/// Run every known rename; returns how many values were copied
pub fn migrate_legacy_keys(kv: &impl KeyValueStore) -> Result<usize, PersistenceError> {
    let mut copied = 0;
    for (old_key, new_key) in KEY_RENAMES {
        if migrate_key(kv, old_key, new_key)? == MigrationOutcome::Copied {
            copied += 1;
        }
    }
    Ok(copied)
}
