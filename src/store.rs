//! Profile store: saved profiles, active connection settings and rotation
//!
//! Holds no cached state. Every read goes to the key-value adapter, and every
//! list mutation is a read-modify-write cycle serialized by an internal lock.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::codec::{self, Decoded};
use crate::config::kv::KeyValueStore;
use crate::config::migrate::migrate_legacy_keys;
use crate::config::settings::{ActiveConnection, Setting};
use crate::constants::{keys, DEFAULT_PROFILE_PREFIX};
use crate::error::{PersistenceError, StoreResult};
use crate::profile::{ProfileList, ServerProfile, Upsert};

/// Outcome of importing profiles from external text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub dropped: usize,
}

pub struct ProfileStore<S: KeyValueStore> {
    kv: S,
    /// Guards list and cursor read-modify-write cycles
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> ProfileStore<S> {
    /// Wrap `kv`, migrating renamed legacy keys before anything is read
    pub fn open(kv: S) -> StoreResult<Self> {
        let copied = migrate_legacy_keys(&kv)?;
        if copied > 0 {
            info!(copied, "Migrated legacy settings");
        }
        Ok(Self {
            kv,
            write_lock: Mutex::new(()),
        })
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    // ==========================================================================
    // Saved profiles
    // ==========================================================================

    /// Decode the stored list, reporting how much was recovered
    pub fn load_profiles(&self) -> Decoded {
        let raw = self.kv.get_string(keys::PROFILES).unwrap_or_default();
        let decoded = codec::decode(&raw);
        debug!(count = decoded.profiles.len(), format = ?decoded.format, "Loaded profiles");
        decoded
    }

    /// Current list; empty when nothing usable is stored
    pub fn list_profiles(&self) -> ProfileList {
        self.load_profiles().profiles
    }

    pub fn find_profile(&self, name: &str) -> Option<ServerProfile> {
        self.list_profiles().find(name).cloned()
    }

    fn save_profiles(&self, profiles: &ProfileList) -> Result<(), PersistenceError> {
        let encoded = codec::encode(profiles)?;
        self.kv.set_string(keys::PROFILES, &encoded)?;
        info!(count = profiles.len(), "Saved profiles");
        Ok(())
    }

    /// Normalize and validate `profile`, then replace the same-named entry
    /// or append it. Returns the profile as stored.
    pub fn upsert_profile(&self, profile: ServerProfile) -> StoreResult<ServerProfile> {
        let profile = profile.normalized();
        profile.validate()?;

        let _guard = self.write_lock.lock();
        let mut profiles = self.list_profiles();
        match profiles.upsert(profile.clone()) {
            Upsert::Replaced(idx) => info!(profile = %profile.name, index = idx, "Replaced profile"),
            Upsert::Appended(idx) => info!(profile = %profile.name, index = idx, "Added profile"),
        }
        self.save_profiles(&profiles)?;
        Ok(profile)
    }

    /// Overwrite the profile named `original_name` at its position, renaming
    /// it if `profile` carries a different name. Returns the stored profile,
    /// or `None` when `original_name` is not saved.
    pub fn edit_profile(&self, original_name: &str, profile: ServerProfile) -> StoreResult<Option<ServerProfile>> {
        let profile = profile.normalized();
        profile.validate()?;

        let _guard = self.write_lock.lock();
        let mut profiles = self.list_profiles();
        let Some(idx) = profiles.replace_named(original_name, profile.clone())? else {
            debug!(profile = %original_name, "No profile to edit");
            return Ok(None);
        };

        self.save_profiles(&profiles)?;
        info!(from = %original_name, profile = %profile.name, index = idx, "Edited profile");
        Ok(Some(profile))
    }

    /// Remove the profile named `name`; absent names are a no-op
    pub fn delete_profile(&self, name: &str) -> StoreResult<Option<ServerProfile>> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.list_profiles();
        let Some(removed) = profiles.remove(name) else {
            debug!(profile = %name, "No profile to delete");
            return Ok(None);
        };

        self.save_profiles(&profiles)?;
        info!(profile = %removed.name, "Deleted profile");
        Ok(Some(removed))
    }

    /// Decode `raw` in either format and upsert every recovered profile
    pub fn import_profiles(&self, raw: &str) -> StoreResult<ImportReport> {
        let decoded = codec::decode(raw);

        let _guard = self.write_lock.lock();
        let mut profiles = self.list_profiles();
        let mut imported = 0;
        for profile in decoded.profiles {
            let profile = profile.normalized();
            if profile.validate().is_err() {
                continue;
            }
            profiles.upsert(profile);
            imported += 1;
        }

        if imported > 0 {
            self.save_profiles(&profiles)?;
        }

        let report = ImportReport {
            imported,
            dropped: decoded.dropped,
        };
        info!(imported = report.imported, dropped = report.dropped, "Imported profiles");
        Ok(report)
    }

    /// Current list in the structured format
    pub fn export_profiles(&self) -> Result<String, PersistenceError> {
        Ok(codec::encode(&self.list_profiles())?)
    }

    // ==========================================================================
    // Applying profiles
    // ==========================================================================

    /// Copy host and credential into the active connection
    pub fn apply_profile(&self, profile: &ServerProfile) -> StoreResult<()> {
        self.kv.set_string(keys::HOST, &profile.host)?;
        self.kv.set_string(keys::CREDENTIAL, &profile.credential)?;
        info!(profile = %profile.name, host = %profile.host, "Applied profile");
        Ok(())
    }

    /// Apply the saved profile named `name`, if any
    pub fn apply_profile_named(&self, name: &str) -> StoreResult<Option<ServerProfile>> {
        let Some(profile) = self.find_profile(name) else {
            debug!(profile = %name, "No profile to apply");
            return Ok(None);
        };
        self.apply_profile(&profile)?;
        Ok(Some(profile))
    }

    /// Raw persisted cursor, never negative
    pub fn rotation_cursor(&self) -> usize {
        self.kv
            .get_int(keys::ROTATION_CURSOR)
            .and_then(|c| usize::try_from(c).ok())
            .unwrap_or(0)
    }

    /// Apply the profile under the rotation cursor and advance it.
    /// Returns `None` without touching anything when no profiles are saved.
    pub fn apply_next_profile(&self) -> StoreResult<Option<ServerProfile>> {
        let _guard = self.write_lock.lock();
        let profiles = self.list_profiles();
        let len = profiles.len();
        let cursor = self.rotation_cursor();
        let index = cursor.min(len.saturating_sub(1));
        let Some(profile) = profiles.get(index).cloned() else {
            debug!("No profiles to rotate through");
            return Ok(None);
        };
        if index != cursor {
            warn!(cursor, len, "Rotation cursor out of range, clamping to last profile");
        }
        self.apply_profile(&profile)?;

        let next = (index + 1) % len;
        self.kv.set_int(keys::ROTATION_CURSOR, next as i64)?;
        debug!(index, next, "Advanced rotation cursor");
        Ok(Some(profile))
    }

    /// Save the active host and credential as a profile named `name`,
    /// or a timestamp-derived name when `name` is blank
    pub fn save_current_as_profile(&self, name: &str) -> StoreResult<ServerProfile> {
        self.save_current_as_profile_at(name, Local::now())
    }

    fn save_current_as_profile_at(&self, name: &str, now: DateTime<Local>) -> StoreResult<ServerProfile> {
        let name = match name.trim() {
            "" => default_profile_name(now),
            trimmed => trimmed.to_string(),
        };
        let profile = ServerProfile::new(name, self.setting(Setting::Host), self.setting(Setting::Credential));
        self.upsert_profile(profile)
    }

    // ==========================================================================
    // Active connection settings
    // ==========================================================================

    /// Stored value, or the setting's default when never written
    pub fn setting(&self, setting: Setting) -> String {
        self.kv.get_string_or(setting.key(), setting.default_value())
    }

    pub fn set_setting(&self, setting: Setting, value: &str) -> StoreResult<()> {
        setting.validate(value)?;
        self.kv.set_string(setting.key(), value)?;
        info!(setting = %setting, "Updated setting");
        Ok(())
    }

    pub fn reset_setting(&self, setting: Setting) -> StoreResult<()> {
        self.kv.set_string(setting.key(), setting.default_value())?;
        info!(setting = %setting, "Reset setting to default");
        Ok(())
    }

    pub fn active_connection(&self) -> ActiveConnection {
        ActiveConnection::from_fn(|setting| self.setting(setting))
    }

    pub fn reset_active_connection(&self) -> StoreResult<()> {
        for setting in Setting::ALL {
            self.reset_setting(setting)?;
        }
        Ok(())
    }
}

fn default_profile_name(now: DateTime<Local>) -> String {
    format!("{DEFAULT_PROFILE_PREFIX} {}", now.format("%Y-%m-%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::kv::MemoryStore;
    use crate::error::{StoreError, ValidationError};
    use crate::profile::ProfileField;
    use chrono::TimeZone;

    fn profile(name: &str, host: &str, pass: &str) -> ServerProfile {
        ServerProfile::new(name, host, pass)
    }

    fn store_with(profiles: &[(&str, &str, &str)]) -> ProfileStore<MemoryStore> {
        let store = ProfileStore::open(MemoryStore::new()).unwrap();
        for (n, h, p) in profiles {
            store.upsert_profile(profile(n, h, p)).unwrap();
        }
        store
    }

    fn names(store: &ProfileStore<MemoryStore>) -> Vec<String> {
        store.list_profiles().iter().map(|p| p.name.clone()).collect()
    }

    /// Adapter whose writes always fail
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get_string(key)
        }
        fn set_string(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Backend("read-only".to_string()))
        }
        fn get_int(&self, key: &str) -> Option<i64> {
            self.0.get_int(key)
        }
        fn set_int(&self, _key: &str, _value: i64) -> Result<(), PersistenceError> {
            Err(PersistenceError::Backend("read-only".to_string()))
        }
        fn get_bool(&self, key: &str) -> Option<bool> {
            self.0.get_bool(key)
        }
        fn set_bool(&self, _key: &str, _value: bool) -> Result<(), PersistenceError> {
            Err(PersistenceError::Backend("read-only".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Backend("read-only".to_string()))
        }
        fn contains(&self, key: &str) -> bool {
            self.0.contains(key)
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = store_with(&[]);
        assert!(store.list_profiles().is_empty());
    }

    #[test]
    fn test_upsert_replaces_by_name_in_place() {
        let store = store_with(&[("alice", "h1", "p1"), ("bob", "hb", "pb")]);

        store.upsert_profile(profile("alice", "h2", "p2")).unwrap();

        let profiles = store.list_profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles.get(0), Some(&profile("alice", "h2", "p2")));
        assert_eq!(names(&store), vec!["alice", "bob"]);
    }

    #[test]
    fn test_upsert_normalizes_input() {
        let store = store_with(&[]);
        let saved = store.upsert_profile(profile(" alice ", "example.com:5666", " pw ")).unwrap();

        assert_eq!(saved, profile("alice", "example.com", "pw"));
        assert_eq!(store.find_profile("ALICE"), Some(saved));
    }

    #[test]
    fn test_upsert_rejects_blank_fields() {
        let store = store_with(&[]);
        let err = store.upsert_profile(profile("alice", "h1", "  ")).unwrap_err();

        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::BlankField(ProfileField::Credential))
        ));
        assert!(store.list_profiles().is_empty());
        assert_eq!(store.kv().get_string(keys::PROFILES), None);
    }

    #[test]
    fn test_upsert_rejects_host_that_is_only_a_port() {
        let store = store_with(&[]);
        let err = store.upsert_profile(profile("alice", ":443", "pw")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::BlankField(ProfileField::Host))
        ));
    }

    #[test]
    fn test_edit_renames_in_place() {
        let store = store_with(&[("alice", "h1", "p1"), ("bob", "h2", "p2")]);

        let edited = store
            .edit_profile("alice", profile(" alicia ", "h3:443", "p3"))
            .unwrap();

        assert_eq!(edited, Some(profile("alicia", "h3", "p3")));
        assert_eq!(names(&store), vec!["alicia", "bob"]);
        assert_eq!(store.find_profile("alice"), None);
    }

    #[test]
    fn test_edit_rejects_name_of_other_profile() {
        let store = store_with(&[("alice", "h1", "p1"), ("bob", "h2", "p2")]);
        let before = store.list_profiles();

        let err = store.edit_profile("alice", profile("Bob", "h3", "p3")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateName(ref name)) if name == "Bob"
        ));
        assert_eq!(store.list_profiles(), before);
    }

    #[test]
    fn test_edit_validates_and_ignores_absent_name() {
        let store = store_with(&[("alice", "h1", "p1")]);

        let err = store.edit_profile("alice", profile("alice", "", "p1")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::BlankField(ProfileField::Host))
        ));

        assert_eq!(store.edit_profile("nobody", profile("x", "h", "p")).unwrap(), None);
        assert_eq!(names(&store), vec!["alice"]);
    }

    #[test]
    fn test_delete_absent_name_is_noop() {
        let store = store_with(&[("alice", "h1", "p1")]);
        let before = store.kv().get_string(keys::PROFILES);

        assert_eq!(store.delete_profile("nonexistent").unwrap(), None);
        assert_eq!(store.kv().get_string(keys::PROFILES), before);
        assert_eq!(names(&store), vec!["alice"]);
    }

    #[test]
    fn test_delete_case_insensitive() {
        let store = store_with(&[("alice", "h1", "p1"), ("bob", "h2", "p2")]);
        let removed = store.delete_profile("BOB").unwrap();

        assert_eq!(removed, Some(profile("bob", "h2", "p2")));
        assert_eq!(names(&store), vec!["alice"]);
    }

    #[test]
    fn test_apply_profile_copies_host_and_credential_only() {
        let store = store_with(&[("alice", "h1", "p1")]);
        let before = store.list_profiles();

        store.apply_profile(&profile("other", "h9", "p9")).unwrap();

        assert_eq!(store.setting(Setting::Host), "h9");
        assert_eq!(store.setting(Setting::Credential), "p9");
        assert_eq!(store.list_profiles(), before);
    }

    #[test]
    fn test_apply_profile_named() {
        let store = store_with(&[("alice", "h1", "p1")]);

        assert_eq!(store.apply_profile_named("missing").unwrap(), None);
        assert_eq!(store.setting(Setting::Host), "");

        assert_eq!(store.apply_profile_named("Alice").unwrap(), Some(profile("alice", "h1", "p1")));
        assert_eq!(store.setting(Setting::Host), "h1");
    }

    #[test]
    fn test_rotation_cycles_and_wraps() {
        let store = store_with(&[("A", "ha", "pa"), ("B", "hb", "pb"), ("C", "hc", "pc")]);

        let mut seen = Vec::new();
        for expected_cursor in [1, 2, 0, 1] {
            let applied = store.apply_next_profile().unwrap().unwrap();
            assert_eq!(store.setting(Setting::Host), applied.host);
            assert_eq!(store.rotation_cursor(), expected_cursor);
            seen.push(applied.name);
        }
        assert_eq!(seen, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_rotation_on_empty_list_changes_nothing() {
        let store = store_with(&[]);
        assert_eq!(store.apply_next_profile().unwrap(), None);
        assert_eq!(store.kv().get_int(keys::ROTATION_CURSOR), None);
        assert_eq!(store.setting(Setting::Host), "");
    }

    #[test]
    fn test_rotation_clamps_out_of_range_cursor() {
        let store = store_with(&[("A", "ha", "pa"), ("B", "hb", "pb"), ("C", "hc", "pc")]);
        store.kv().set_int(keys::ROTATION_CURSOR, 2).unwrap();
        store.delete_profile("C").unwrap();

        let applied = store.apply_next_profile().unwrap().unwrap();
        assert_eq!(applied.name, "B");
        assert_eq!(store.rotation_cursor(), 0);

        store.kv().set_int(keys::ROTATION_CURSOR, 99).unwrap();
        assert_eq!(store.apply_next_profile().unwrap().unwrap().name, "B");
        assert_eq!(store.rotation_cursor(), 0);

        store.kv().set_int(keys::ROTATION_CURSOR, -5).unwrap();
        assert_eq!(store.apply_next_profile().unwrap().unwrap().name, "A");
    }

    #[test]
    fn test_save_current_as_profile_named() {
        let store = store_with(&[("home", "old", "old")]);
        store.set_setting(Setting::Host, "h1").unwrap();
        store.set_setting(Setting::Credential, "p1").unwrap();

        let saved = store.save_current_as_profile(" HOME ").unwrap();
        assert_eq!(saved, profile("HOME", "h1", "p1"));
        assert_eq!(store.list_profiles().len(), 1);
    }

    #[test]
    fn test_save_current_as_profile_default_name() {
        let store = store_with(&[]);
        store.set_setting(Setting::Host, "h1").unwrap();
        store.set_setting(Setting::Credential, "p1").unwrap();

        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let saved = store.save_current_as_profile_at("   ", now).unwrap();
        assert_eq!(saved.name, "Profile 2024-03-09 14:05:07");
    }

    #[test]
    fn test_save_current_without_active_host_fails() {
        let store = store_with(&[]);
        let err = store.save_current_as_profile("x").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_settings_default_set_and_reset() {
        let store = store_with(&[]);
        assert_eq!(store.setting(Setting::UplinkRate), "1 mbps");

        store.set_setting(Setting::UplinkRate, "20 mbps").unwrap();
        assert_eq!(store.active_connection().uplink_rate, "20 mbps");

        store.reset_setting(Setting::UplinkRate).unwrap();
        assert_eq!(store.setting(Setting::UplinkRate), "1 mbps");

        store.set_setting(Setting::Host, "h").unwrap();
        store.reset_active_connection().unwrap();
        assert_eq!(store.active_connection(), ActiveConnection::default());
    }

    #[test]
    fn test_set_invalid_port_ranges_rejected() {
        let store = store_with(&[]);
        assert!(store.set_setting(Setting::PortRanges, "100-1").is_err());
        assert_eq!(store.setting(Setting::PortRanges), crate::constants::defaults::PORT_RANGES);

        store.set_setting(Setting::PortRanges, "1000-2000").unwrap();
        assert_eq!(store.setting(Setting::PortRanges), "1000-2000");
    }

    #[test]
    fn test_open_migrates_before_reads() {
        let kv = MemoryStore::new();
        kv.set_string("zivpn_hysteria_up", "7 mbps").unwrap();
        kv.set_string("zivpn_hysteria_receive_window", "999").unwrap();

        let store = ProfileStore::open(kv).unwrap();
        assert_eq!(store.setting(Setting::UplinkRate), "7 mbps");
        assert_eq!(store.setting(Setting::ReceiveWindow), "999");
        assert_eq!(store.setting(Setting::DownlinkRate), "3 mbps");
    }

    #[test]
    fn test_open_keeps_int_typed_current_value() {
        let kv = MemoryStore::new();
        kv.set_int(keys::RECEIVE_WINDOW, 8_000_000).unwrap();
        kv.set_string("zivpn_hysteria_receive_window", "999").unwrap();

        let store = ProfileStore::open(kv).unwrap();
        assert_eq!(store.kv().get_int(keys::RECEIVE_WINDOW), Some(8_000_000));
        assert_eq!(store.setting(Setting::ReceiveWindow), "8000000");
    }

    #[test]
    fn test_int_typed_setting_reads_as_text() {
        let store = store_with(&[]);
        store.kv().set_int(keys::RECEIVE_WINDOW_PER_CONN, 16_777_216).unwrap();

        assert_eq!(store.setting(Setting::ReceiveWindowPerConn), "16777216");
        assert_eq!(store.active_connection().receive_window_per_conn, "16777216");
    }

    #[test]
    fn test_open_without_legacy_keys_writes_nothing() {
        let store = ProfileStore::open(MemoryStore::new()).unwrap();
        assert!(store.kv().is_empty());
    }

    #[test]
    fn test_corrupt_profiles_degrade_and_stay_writable() {
        let kv = MemoryStore::new();
        kv.set_string(keys::PROFILES, "not json and not pipes").unwrap();
        let store = ProfileStore::open(kv).unwrap();

        let loaded = store.load_profiles();
        assert!(loaded.profiles.is_empty());
        assert!(loaded.is_degraded());

        store.upsert_profile(profile("alice", "h1", "p1")).unwrap();
        assert_eq!(names(&store), vec!["alice"]);
    }

    #[test]
    fn test_legacy_list_rewritten_as_structured_on_save() {
        let kv = MemoryStore::new();
        kv.set_string(keys::PROFILES, "alice|host1|pw1\nbob|host2|pw2").unwrap();
        let store = ProfileStore::open(kv).unwrap();

        store.upsert_profile(profile("carol", "host3", "pw3")).unwrap();

        let raw = store.kv().get_string(keys::PROFILES).unwrap();
        assert!(raw.starts_with('['));
        assert_eq!(names(&store), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_import_merges_by_name() {
        let store = store_with(&[("alice", "h1", "p1")]);
        let report = store
            .import_profiles("ALICE|h2:443|p2\nbob|hb|pb\nbroken")
            .unwrap();

        assert_eq!(report, ImportReport { imported: 2, dropped: 1 });
        let profiles = store.list_profiles();
        assert_eq!(profiles.get(0), Some(&profile("ALICE", "h2", "p2")));
        assert_eq!(profiles.get(1), Some(&profile("bob", "hb", "pb")));
    }

    #[test]
    fn test_export_is_structured() {
        let store = store_with(&[("alice", "h1", "p1")]);
        assert_eq!(
            store.export_profiles().unwrap(),
            r#"[{"name":"alice","host":"h1","password":"p1"}]"#
        );
    }

    #[test]
    fn test_write_failures_propagate() {
        let store = ProfileStore::open(ReadOnlyStore(MemoryStore::new())).unwrap();

        let err = store.upsert_profile(profile("alice", "h1", "p1")).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(PersistenceError::Backend(_))));

        let err = store.apply_profile(&profile("alice", "h1", "p1")).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
    }

    #[test]
    fn test_open_fails_when_migration_cannot_write() {
        let inner = MemoryStore::new();
        inner.set_string("zivpn_hysteria_up", "7 mbps").unwrap();

        let result = ProfileStore::open(ReadOnlyStore(inner));
        assert!(matches!(result, Err(StoreError::Persistence(_))));
    }

    #[test]
    fn test_store_over_borrowed_adapter() {
        let kv = MemoryStore::new();
        {
            let store = ProfileStore::open(&kv).unwrap();
            store.upsert_profile(profile("alice", "h1", "p1")).unwrap();
        }
        let reopened = ProfileStore::open(&kv).unwrap();
        assert_eq!(reopened.list_profiles().len(), 1);
    }
}
