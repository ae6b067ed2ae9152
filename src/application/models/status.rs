use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque status identifier. Totally ordered; the API delivers history
/// newest-first, so ids strictly decrease as older pages are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatusId(#[serde(with = "id_repr")] pub u64);

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The API serializes ids as decimal strings; older instances returned bare
/// integers. Accept both, emit strings.
mod id_repr {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(n),
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// A single status as returned by the account-statuses endpoint. Validated
/// here at the deserialization boundary; immutable once fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub favourites_count: u64,
    #[serde(default)]
    pub reblogs_count: u64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Only present on self-fetched timelines. Not consulted by the
    /// retention policy: pinned statuses stay deletion-eligible.
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
}
