// ── Record identity ──
//
// Collections key their records by either an integer primary key or a
// string (tag UIDs, generated ids). `EntityId` carries both behind one
// ordered, hashable type so selection and expansion sets stay generic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a record, unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl EntityId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(_) => None,
        }
    }

    /// An id typed by a user, kept exactly as written so request paths
    /// carry it unchanged (`007` stays `007`).
    pub fn verbatim(raw: impl Into<String>) -> Self {
        Self::Str(raw.into())
    }

    /// Whether this id renders as `raw`. Matches across the `Int`/`Str`
    /// split: a server that sends `"42"` still answers to a typed `42`.
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            Self::Int(n) => n.to_string() == raw,
            Self::Str(s) => s == raw,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse() {
                return Self::Int(n);
            }
        }
        Self::Str(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}
