//! Saved connection targets and the ordered, name-unique list holding them

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::host::parse_host;

/// Required profile field, named in validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Host,
    Credential,
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileField::Name => write!(f, "name"),
            ProfileField::Host => write!(f, "host"),
            ProfileField::Credential => write!(f, "password"),
        }
    }
}

/// One saved connection target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub name: String,
    /// Bare host, never carries a `:port` suffix
    pub host: String,
    #[serde(rename = "password")]
    pub credential: String,
}

impl ServerProfile {
    pub fn new(name: impl Into<String>, host: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            credential: credential.into(),
        }
    }

    /// Trim every field and strip a port from the host
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            host: parse_host(self.host.trim()).to_string(),
            credential: self.credential.trim().to_string(),
        }
    }

    /// Reject profiles with a blank required field
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField(ProfileField::Name));
        }
        if self.host.trim().is_empty() {
            return Err(ValidationError::BlankField(ProfileField::Host));
        }
        if self.credential.trim().is_empty() {
            return Err(ValidationError::BlankField(ProfileField::Credential));
        }
        Ok(())
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Where an upserted profile ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Replaced(usize),
    Appended(usize),
}

impl Upsert {
    pub fn index(self) -> usize {
        match self {
            Upsert::Replaced(idx) | Upsert::Appended(idx) => idx,
        }
    }
}

/// Ordered profiles, unique by case-insensitive name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProfileList(Vec<ServerProfile>);

impl ProfileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ServerProfile> {
        self.0.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServerProfile> {
        self.0.iter()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|p| p.is_named(name))
    }

    pub fn find(&self, name: &str) -> Option<&ServerProfile> {
        self.position(name).map(|idx| &self.0[idx])
    }

    /// Replace the entry with the same name in place, or append
    pub fn upsert(&mut self, profile: ServerProfile) -> Upsert {
        match self.position(&profile.name) {
            Some(idx) => {
                self.0[idx] = profile;
                Upsert::Replaced(idx)
            }
            None => {
                self.0.push(profile);
                Upsert::Appended(self.0.len() - 1)
            }
        }
    }

    /// Append only if the name is not taken yet; returns whether it was added
    pub(crate) fn push_unique(&mut self, profile: ServerProfile) -> bool {
        if self.position(&profile.name).is_some() {
            return false;
        }
        self.0.push(profile);
        true
    }

    /// Overwrite the entry named `old_name` at its position, possibly under
    /// a new name. `Ok(None)` when `old_name` is absent; a new name already
    /// used by a different entry is rejected.
    pub fn replace_named(
        &mut self,
        old_name: &str,
        profile: ServerProfile,
    ) -> Result<Option<usize>, ValidationError> {
        let Some(idx) = self.position(old_name) else {
            return Ok(None);
        };
        if self.position(&profile.name).is_some_and(|other| other != idx) {
            return Err(ValidationError::DuplicateName(profile.name));
        }
        self.0[idx] = profile;
        Ok(Some(idx))
    }

    pub fn remove(&mut self, name: &str) -> Option<ServerProfile> {
        self.position(name).map(|idx| self.0.remove(idx))
    }
}

impl<'a> IntoIterator for &'a ProfileList {
    type Item = &'a ServerProfile;
    type IntoIter = std::slice::Iter<'a, ServerProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for ProfileList {
    type Item = ServerProfile;
    type IntoIter = std::vec::IntoIter<ServerProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Collects keeping the first profile for each name
impl FromIterator<ServerProfile> for ProfileList {
    fn from_iter<I: IntoIterator<Item = ServerProfile>>(iter: I) -> Self {
        let mut list = ProfileList::new();
        for profile in iter {
            list.push_unique(profile);
        }
        list
    }
}
