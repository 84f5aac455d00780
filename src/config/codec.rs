//! Profile list encoding
//!
//! Two formats have been written over time:
//! - **structured**: JSON array of `{ "name", "host", "password" }` objects
//!   (older builds wrote the credential as `pass`)
//! - **legacy**: one `name|host|password` record per line
//!
//! Decoding tries each format in order and never fails: records that do not
//! parse or validate are dropped and counted. Encoding always writes the
//! structured format.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::codec::{LEGACY_DELIMITER, STRUCTURED_PREFIX};
use crate::profile::{ProfileList, ServerProfile};

/// Format the profiles were recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Nothing stored
    Empty,
    Structured,
    Legacy,
}

/// Result of decoding, including how much was lost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub profiles: ProfileList,
    pub format: SourceFormat,
    /// Records skipped because they were malformed, blank or duplicated
    pub dropped: usize,
}

impl Decoded {
    fn empty() -> Self {
        Self {
            profiles: ProfileList::new(),
            format: SourceFormat::Empty,
            dropped: 0,
        }
    }

    /// Some stored records could not be recovered
    pub fn is_degraded(&self) -> bool {
        self.dropped > 0
    }
}

/// One structured record as found on disk; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProfile {
    name: String,
    host: String,
    password: Option<String>,
    /// Written by older builds
    pass: Option<String>,
    credential: Option<String>,
}

impl From<RawProfile> for ServerProfile {
    /// `password` wins over the historic names when several are present
    fn from(raw: RawProfile) -> Self {
        let credential = raw.password.or(raw.pass).or(raw.credential).unwrap_or_default();
        ServerProfile::new(raw.name, raw.host, credential)
    }
}

/// Records extracted by one format before validation.
/// `None` entries are records that could not be parsed at all.
type Records = Vec<Option<ServerProfile>>;

type FormatParser = fn(&str) -> Option<Records>;

/// Tried in order; the first parser that accepts the input wins
const PARSERS: &[(SourceFormat, FormatParser)] = &[
    (SourceFormat::Structured, parse_structured),
    (SourceFormat::Legacy, parse_legacy),
];

/// Decode stored profile data, recovering whatever is valid
pub fn decode(raw: &str) -> Decoded {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Decoded::empty();
    }

    for (format, parser) in PARSERS {
        let Some(records) = parser(trimmed) else {
            continue;
        };

        let total = records.len();
        let profiles: ProfileList = records
            .into_iter()
            .flatten()
            .filter(|p| match p.validate() {
                Ok(()) => true,
                Err(e) => {
                    debug!(profile = %p.name, error = %e, "Dropping invalid profile record");
                    false
                }
            })
            .collect();

        let dropped = total - profiles.len();
        if dropped > 0 {
            warn!(format = ?format, recovered = profiles.len(), dropped, "Profile data partially unreadable");
        }

        return Decoded {
            profiles,
            format: *format,
            dropped,
        };
    }

    // parse_legacy accepts any input; kept for completeness
    Decoded::empty()
}

/// Serialize `profiles` in the structured format
pub fn encode(profiles: &ProfileList) -> serde_json::Result<String> {
    serde_json::to_string(profiles)
}

fn parse_structured(input: &str) -> Option<Records> {
    if !input.starts_with(STRUCTURED_PREFIX) {
        return None;
    }

    match serde_json::from_str::<Vec<Value>>(input) {
        Ok(values) => Some(
            values
                .into_iter()
                .map(|value| {
                    serde_json::from_value::<RawProfile>(value)
                        .map(ServerProfile::from)
                        .ok()
                })
                .collect(),
        ),
        Err(e) => {
            warn!(error = %e, "Structured profile data unreadable, trying legacy format");
            None
        }
    }
}

fn parse_legacy(input: &str) -> Option<Records> {
    let records = input
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(parse_legacy_line)
        .collect();
    Some(records)
}

/// `name|host|password`, where the password keeps any further `|`
fn parse_legacy_line(line: &str) -> Option<ServerProfile> {
    let mut fields = line.splitn(3, LEGACY_DELIMITER);
    let name = fields.next()?;
    let host = fields.next()?;
    let password = fields.next()?;
    Some(ServerProfile::new(name, host, password))
}
