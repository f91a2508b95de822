use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Largest id the store will hand out or accept from a snapshot.
/// Keeps `max_id + 1` representable so allocation can never wrap.
pub const MAX_USER_ID: u64 = i64::MAX as u64;

/// Positive integer identifier of a user.
///
/// Rendered as its decimal string both in snapshots (as the object key) and in
/// the record-with-id returned to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(u64);

impl UserId {
    /// The id allocated first in an empty store.
    pub const FIRST: UserId = UserId(1);

    pub fn new(raw: u64) -> Result<Self, ModelError> {
        if raw == 0 || raw > MAX_USER_ID {
            return Err(ModelError::InvalidId(raw.to_string()));
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The id following this one, or `None` once the id space is exhausted.
    pub fn next(self) -> Option<UserId> {
        UserId::new(self.0 + 1).ok()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ModelError;

    /// Accepts surrounding whitespace, a leading `+` and single `_` separators
    /// between digits (`" 7"`, `"+5"`, `"1_000"`), the same spellings a
    /// hand-edited snapshot key may carry.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidId(s.to_string());
        let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if digits.is_empty() || digits.split('_').any(|group| group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit())) {
            return Err(invalid());
        }
        let raw = digits.replace('_', "").parse::<u64>().map_err(|_| invalid())?;
        UserId::new(raw).map_err(|_| invalid())
    }
}

impl TryFrom<String> for UserId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.to_string()
    }
}

/// First/last name pair kept by the store for one id.
///
/// Absent fields read as empty strings; a field holding anything other than a
/// string (`null` included) fails to decode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserRecord {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self { first_name: first_name.into(), last_name: last_name.into() }
    }
}

/// A record rendered together with its id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn from_record(id: UserId, record: &UserRecord) -> Self {
        Self {
            id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
        }
    }

    /// Split back into the key/value shape the store keeps.
    pub fn into_parts(self) -> (UserId, UserRecord) {
        (self.id, UserRecord { first_name: self.first_name, last_name: self.last_name })
    }
}
