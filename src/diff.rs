//! Diff engine
//!
//! Compares two snapshots and classifies every ID as added, removed or
//! changed. Output collections are ordered so the same pair of snapshots
//! always yields the same change set.

use crate::snapshot::Snapshot;
use crate::types::{ResourceId, ResourceRecord, TrackedField};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// An ID present in both snapshots whose tracked metadata differs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedEntry {
    pub id: ResourceId,
    pub previous: ResourceRecord,
    pub current: ResourceRecord,
}

/// Delta between two snapshots.
///
/// An ID appears in at most one of the three collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: BTreeSet<ResourceId>,
    pub removed: BTreeSet<ResourceId>,
    pub changed: Vec<ChangedEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }

    /// Ordered events for the sink: all removed, then all added, then all changed.
    ///
    /// `previous` and `current` must be the snapshots this change set was
    /// computed from; they supply the records for removed and added IDs.
    pub fn events(&self, previous: &Snapshot, current: &Snapshot) -> Vec<ChangeEvent> {
        let removed = self
            .removed
            .iter()
            .filter_map(|id| previous.get(id))
            .cloned()
            .map(ChangeEvent::Removed);
        let added = self
            .added
            .iter()
            .filter_map(|id| current.get(id))
            .cloned()
            .map(ChangeEvent::Added);
        let changed = self.changed.iter().map(|entry| ChangeEvent::Changed {
            fields: entry.previous.changed_fields(&entry.current),
            previous: entry.previous.clone(),
            current: entry.current.clone(),
        });
        removed.chain(added).chain(changed).collect()
    }
}

/// A single change as forwarded to the notification sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Removed(ResourceRecord),
    Added(ResourceRecord),
    Changed {
        previous: ResourceRecord,
        current: ResourceRecord,
        fields: Vec<TrackedField>,
    },
}

impl ChangeEvent {
    pub fn id(&self) -> &ResourceId {
        match self {
            ChangeEvent::Removed(record) | ChangeEvent::Added(record) => &record.id,
            ChangeEvent::Changed { current, .. } => &current.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Removed(_) => "removed",
            ChangeEvent::Added(_) => "added",
            ChangeEvent::Changed { .. } => "changed",
        }
    }
}

/// Ordered change events detected for one directory in one cycle
#[derive(Debug, Clone)]
pub struct ChangeReport {
    pub directory: String,
    pub detected_at: DateTime<Utc>,
    pub events: Vec<ChangeEvent>,
}

impl ChangeReport {
    pub fn new(directory: impl Into<String>, events: Vec<ChangeEvent>) -> Self {
        Self {
            directory: directory.into(),
            detected_at: Utc::now(),
            events,
        }
    }

    pub fn removed(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.events.iter().filter_map(|event| match event {
            ChangeEvent::Removed(record) => Some(record),
            _ => None,
        })
    }

    pub fn added(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.events.iter().filter_map(|event| match event {
            ChangeEvent::Added(record) => Some(record),
            _ => None,
        })
    }
}

/// Compute the change set between `previous` and `current`.
///
/// With no previous snapshot (the seeding fetch) the change set is empty:
/// there is nothing meaningful to compare against.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeSet {
    let Some(previous) = previous else {
        return ChangeSet::default();
    };

    let mut change_set = ChangeSet::default();

    for (id, record) in previous.iter() {
        match current.get(id) {
            None => {
                change_set.removed.insert(id.clone());
            }
            Some(now) if !record.metadata_eq(now) => {
                change_set.changed.push(ChangedEntry {
                    id: id.clone(),
                    previous: record.clone(),
                    current: now.clone(),
                });
            }
            Some(_) => {}
        }
    }

    change_set.added = current
        .iter()
        .map(|(id, _)| id)
        .filter(|id| !previous.contains(id))
        .cloned()
        .collect();

    change_set
}
