//! Currently applied transport parameters
//!
//! Each setting is an independent string key with a fixed default. These are
//! separate from the saved profile list: applying a profile only copies its
//! host and credential here.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::constants::{defaults, keys, validation};
use crate::error::ValidationError;

/// One scalar setting of the active connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Host,
    Credential,
    Obfuscation,
    PortRanges,
    ReceiveWindow,
    ReceiveWindowPerConn,
    UplinkRate,
    DownlinkRate,
    ExtraYaml,
}

impl Setting {
    pub const ALL: [Setting; 9] = [
        Setting::Host,
        Setting::Credential,
        Setting::Obfuscation,
        Setting::PortRanges,
        Setting::ReceiveWindow,
        Setting::ReceiveWindowPerConn,
        Setting::UplinkRate,
        Setting::DownlinkRate,
        Setting::ExtraYaml,
    ];

    /// Persisted key
    pub fn key(self) -> &'static str {
        match self {
            Setting::Host => keys::HOST,
            Setting::Credential => keys::CREDENTIAL,
            Setting::Obfuscation => keys::OBFUSCATION,
            Setting::PortRanges => keys::PORT_RANGES,
            Setting::ReceiveWindow => keys::RECEIVE_WINDOW,
            Setting::ReceiveWindowPerConn => keys::RECEIVE_WINDOW_PER_CONN,
            Setting::UplinkRate => keys::UPLINK_RATE,
            Setting::DownlinkRate => keys::DOWNLINK_RATE,
            Setting::ExtraYaml => keys::EXTRA_YAML,
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Setting::Host | Setting::Credential | Setting::ExtraYaml => "",
            Setting::Obfuscation => defaults::OBFUSCATION,
            Setting::PortRanges => defaults::PORT_RANGES,
            Setting::ReceiveWindow => defaults::RECEIVE_WINDOW,
            Setting::ReceiveWindowPerConn => defaults::RECEIVE_WINDOW_PER_CONN,
            Setting::UplinkRate => defaults::UPLINK_RATE,
            Setting::DownlinkRate => defaults::DOWNLINK_RATE,
        }
    }

    /// Kebab-case name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            Setting::Host => "host",
            Setting::Credential => "credential",
            Setting::Obfuscation => "obfuscation",
            Setting::PortRanges => "port-ranges",
            Setting::ReceiveWindow => "receive-window",
            Setting::ReceiveWindowPerConn => "receive-window-per-conn",
            Setting::UplinkRate => "uplink-rate",
            Setting::DownlinkRate => "downlink-rate",
            Setting::ExtraYaml => "extra-yaml",
        }
    }

    /// Values that must be checked before they are stored
    pub fn validate(self, value: &str) -> Result<(), ValidationError> {
        match self {
            Setting::PortRanges => parse_port_ranges(value).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Setting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Setting::ALL
            .into_iter()
            .find(|setting| setting.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Setting::ALL.iter().map(|s| s.name()).collect();
                format!("unknown setting '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Snapshot of every scalar setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConnection {
    pub host: String,
    pub credential: String,
    pub obfuscation: String,
    pub port_ranges: String,
    pub receive_window: String,
    pub receive_window_per_conn: String,
    pub uplink_rate: String,
    pub downlink_rate: String,
    pub extra_config_yaml: String,
}

impl ActiveConnection {
    /// Build from a per-setting lookup
    pub fn from_fn(mut value_of: impl FnMut(Setting) -> String) -> Self {
        Self {
            host: value_of(Setting::Host),
            credential: value_of(Setting::Credential),
            obfuscation: value_of(Setting::Obfuscation),
            port_ranges: value_of(Setting::PortRanges),
            receive_window: value_of(Setting::ReceiveWindow),
            receive_window_per_conn: value_of(Setting::ReceiveWindowPerConn),
            uplink_rate: value_of(Setting::UplinkRate),
            downlink_rate: value_of(Setting::DownlinkRate),
            extra_config_yaml: value_of(Setting::ExtraYaml),
        }
    }

    pub fn get(&self, setting: Setting) -> &str {
        match setting {
            Setting::Host => &self.host,
            Setting::Credential => &self.credential,
            Setting::Obfuscation => &self.obfuscation,
            Setting::PortRanges => &self.port_ranges,
            Setting::ReceiveWindow => &self.receive_window,
            Setting::ReceiveWindowPerConn => &self.receive_window_per_conn,
            Setting::UplinkRate => &self.uplink_rate,
            Setting::DownlinkRate => &self.downlink_rate,
            Setting::ExtraYaml => &self.extra_config_yaml,
        }
    }
}

impl Default for ActiveConnection {
    fn default() -> Self {
        Self::from_fn(|setting| setting.default_value().to_string())
    }
}

/// Parse `lo-hi[,lo-hi...]` into inclusive port ranges
pub fn parse_port_ranges(value: &str) -> Result<Vec<RangeInclusive<u16>>, ValidationError> {
    let invalid = || ValidationError::InvalidPortRanges(value.to_string());

    if value.trim().is_empty() {
        return Err(invalid());
    }

    value
        .split(',')
        .map(|part| {
            let (lo, hi) = part.trim().split_once('-').ok_or_else(invalid)?;
            let lo: u16 = lo.trim().parse().map_err(|_| invalid())?;
            let hi: u16 = hi.trim().parse().map_err(|_| invalid())?;
            if lo < validation::MIN_PORT || lo > hi || hi > validation::MAX_PORT {
                return Err(invalid());
            }
            Ok(lo..=hi)
        })
        .collect()
}
