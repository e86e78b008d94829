//! Memory entry types shared by every component that records audit data.
//!
//! Entries live in one of two partitions. An entry with a TTL is expired
//! once `now - creation_time > ttl`; an entry without one never expires.

use crate::error::MemoryError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest and highest entry priority.
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// The partition an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    ShortTerm,
    LongTerm,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short_term" | "short-term" | "short" => Ok(Self::ShortTerm),
            "long_term" | "long-term" | "long" => Ok(Self::LongTerm),
            other => Err(MemoryError::InvalidPartition(other.to_string())),
        }
    }
}

/// A single stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique within its partition.
    pub id: String,

    /// Opaque structured payload.
    pub content: serde_json::Value,

    pub creation_time: DateTime<Utc>,

    pub memory_type: MemoryType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Time-to-live, serialized as whole seconds.
    #[serde(default, with = "ttl_seconds", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<TimeDelta>,

    /// 1 (lowest) to 10 (highest); used as the primary search sort key.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    MIN_PRIORITY
}

impl MemoryEntry {
    /// Create an entry stamped with the current time and priority 1.
    pub fn new(id: impl Into<String>, content: serde_json::Value, memory_type: MemoryType) -> Self {
        Self {
            id: id.into(),
            content,
            creation_time: Utc::now(),
            memory_type,
            tags: Vec::new(),
            ttl: None,
            priority: default_priority(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the priority, clamped into `1..=10`.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self
    }

    /// Override the creation timestamp.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.creation_time = at;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.ttl.is_some_and(|ttl| now - self.creation_time > ttl)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True when any of `wanted` appears in this entry's tags.
    pub fn has_any_tag<S: AsRef<str>>(&self, wanted: &[S]) -> bool {
        wanted
            .iter()
            .any(|w| self.tags.iter().any(|t| t == w.as_ref()))
    }

    /// Crude size of the payload: the length of its textual form.
    pub fn size_estimate(&self) -> usize {
        match &self.content {
            serde_json::Value::String(s) => s.len(),
            other => other.to_string().len(),
        }
    }
}

mod ttl_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
        match ttl {
            Some(d) => s.serialize_some(&d.num_seconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeDelta>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(TimeDelta::seconds))
    }
}
