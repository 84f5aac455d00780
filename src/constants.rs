//! Application-wide constants
//!
//! Persisted key names, default values and file locations live here so the
//! store, the migrator and the CLI agree on a single source of truth.

/// Settings file location
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "tunnel-profiles";

    /// Settings file name (JSON object of key -> value)
    pub const FILENAME: &str = "settings.json";

    /// Environment variable overriding the settings file path
    pub const SETTINGS_FILE_ENV: &str = "TUNNEL_PROFILES_SETTINGS";
}

/// Persisted key names
pub mod keys {
    pub const HOST: &str = "zivpn_server_host";
    pub const CREDENTIAL: &str = "zivpn_server_pass";
    pub const OBFUSCATION: &str = "zivpn_server_obfs";
    pub const PORT_RANGES: &str = "zivpn_port_ranges";
    pub const RECEIVE_WINDOW: &str = "zivpn_recvwindow";
    pub const RECEIVE_WINDOW_PER_CONN: &str = "zivpn_recvwindowconn";
    pub const UPLINK_RATE: &str = "zivpn_up";
    pub const DOWNLINK_RATE: &str = "zivpn_down";
    pub const EXTRA_YAML: &str = "zivpn_clash_yaml";

    /// Encoded profile list
    pub const PROFILES: &str = "zivpn_profiles";

    /// Round-robin index used by "apply next profile"
    pub const ROTATION_CURSOR: &str = "zivpn_profile_cursor";
}

/// Default values for scalar settings
pub mod defaults {
    pub const OBFUSCATION: &str = "hu``hqb`c";

    /// Eight contiguous ranges covering 6000-19999
    pub const PORT_RANGES: &str = "6000-7750,7751-9500,9501-11250,11251-13000,13001-14750,14751-16500,16501-18250,18251-19999";

    pub const RECEIVE_WINDOW: &str = "3145728";
    pub const RECEIVE_WINDOW_PER_CONN: &str = "12582912";
    pub const UPLINK_RATE: &str = "1 mbps";
    pub const DOWNLINK_RATE: &str = "3 mbps";
}

/// Keys renamed between releases: (old, new)
pub mod legacy {
    pub const KEY_RENAMES: &[(&str, &str)] = &[
        ("zivpn_hysteria_up", super::keys::UPLINK_RATE),
        ("zivpn_hysteria_down", super::keys::DOWNLINK_RATE),
        ("zivpn_hysteria_receive_window", super::keys::RECEIVE_WINDOW),
        ("zivpn_hysteria_recv_window_conn", super::keys::RECEIVE_WINDOW_PER_CONN),
    ];
}

/// Profile list encoding
pub mod codec {
    /// Field separator of the legacy line format (`name|host|password`)
    pub const LEGACY_DELIMITER: char = '|';

    /// Structured payloads are JSON arrays
    pub const STRUCTURED_PREFIX: char = '[';
}

/// Validation bounds
pub mod validation {
    pub const MIN_PORT: u16 = 1;
    pub const MAX_PORT: u16 = 65535;
}

/// Prefix for profiles saved without an explicit name
pub const DEFAULT_PROFILE_PREFIX: &str = "Profile";
