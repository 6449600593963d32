//! Core types for the room-directory watchdog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ResourceId: opaque, stable identifier of a directory entry (a room ID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        ResourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        ResourceId(id)
    }
}

/// Metadata fields that participate in change detection, in comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedField {
    Name,
    Topic,
}

impl TrackedField {
    /// Fixed comparison order used by the diff engine
    pub const ORDER: [TrackedField; 2] = [TrackedField::Name, TrackedField::Topic];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Name => "name",
            TrackedField::Topic => "topic",
        }
    }
}

/// One directory entry as captured by a single fetch.
///
/// Only `name` and `topic` are tracked. `canonical_alias` and `joined_members`
/// are carried for presentation and never affect metadata equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_alias: Option<String>,
    #[serde(default)]
    pub joined_members: u64,
}

impl ResourceRecord {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            topic: None,
            canonical_alias: None,
            joined_members: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_canonical_alias(mut self, alias: impl Into<String>) -> Self {
        self.canonical_alias = Some(alias.into());
        self
    }

    pub fn with_joined_members(mut self, count: u64) -> Self {
        self.joined_members = count;
        self
    }

    /// Value of a tracked field
    pub fn field(&self, field: TrackedField) -> Option<&str> {
        match field {
            TrackedField::Name => self.name.as_deref(),
            TrackedField::Topic => self.topic.as_deref(),
        }
    }

    /// Tracked fields whose values differ from `other`, in comparison order.
    pub fn changed_fields(&self, other: &ResourceRecord) -> Vec<TrackedField> {
        TrackedField::ORDER
            .into_iter()
            .filter(|field| self.field(*field) != other.field(*field))
            .collect()
    }

    /// True iff every tracked field compares equal
    pub fn metadata_eq(&self, other: &ResourceRecord) -> bool {
        TrackedField::ORDER
            .iter()
            .all(|field| self.field(*field) == other.field(*field))
    }

    /// Human-facing label: the name, else the canonical alias, else the ID
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.canonical_alias.as_deref())
            .unwrap_or(self.id.as_str())
    }
}
