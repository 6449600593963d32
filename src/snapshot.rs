//! Snapshots and the snapshot store.
//!
//! A [`Snapshot`] is one complete enumeration of a directory. The
//! [`SnapshotStore`] holds the last confirmed snapshot for one watch loop; it
//! starts empty and is only ever replaced wholesale.

use crate::types::{ResourceId, ResourceRecord};
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// ResourceId -> ResourceRecord for one fully paginated enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: BTreeMap<ResourceId, ResourceRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record, overwriting any earlier entry with the same ID.
    pub fn insert(&mut self, record: ResourceRecord) -> Option<ResourceRecord> {
        self.records.insert(record.id.clone(), record)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&ResourceRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> BTreeSet<ResourceId> {
        self.records.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ResourceId, ResourceRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> btree_map::Values<'_, ResourceId, ResourceRecord> {
        self.records.values()
    }
}

impl FromIterator<ResourceRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = ResourceRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl Extend<ResourceRecord> for Snapshot {
    fn extend<I: IntoIterator<Item = ResourceRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

/// Last confirmed snapshot of one watched directory.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn is_seeded(&self) -> bool {
        self.current.is_some()
    }

    /// Replace the stored snapshot, returning the previous one.
    pub fn replace(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.current.replace(snapshot)
    }
}
