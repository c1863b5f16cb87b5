//! Per-resource record table
//!
//! Each registered resource owns one table holding:
//! - live records in insertion order (keyed by an insertion sequence)
//! - a primary-key index for O(1) lookup and count
//! - a tombstone set distinguishing deleted keys from never-issued ones
//! - the sequential key generator for resources with generated integer keys
//!
//! Tombstones are retained for the lifetime of the resource and discarded
//! with it on drop.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::resource::{KeyKind, Resource};

use super::record::{key_index_string, Record};

/// What a table knows about a primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyStatus {
    /// A live record holds this key
    Live,
    /// The key was issued and the record has since been deleted
    Deleted,
    /// The key was never issued
    NeverIssued,
}

/// Record table for a single resource.
#[derive(Debug)]
pub(crate) struct ResourceTable {
    /// The owning descriptor
    resource: Resource,
    /// Live records by insertion sequence; iteration yields insertion order
    records: BTreeMap<u64, Record>,
    /// Canonical primary key -> insertion sequence
    index: HashMap<String, u64>,
    /// Canonical primary keys of deleted records
    tombstones: HashSet<String>,
    /// Next insertion sequence
    next_seq: u64,
    /// Next generated integer key
    next_key: u64,
    /// Set when the resource has been dropped out from under a racing caller
    dropped: bool,
}

impl ResourceTable {
    pub(crate) fn new(resource: Resource) -> Self {
        Self {
            resource,
            records: BTreeMap::new(),
            index: HashMap::new(),
            tombstones: HashSet::new(),
            next_seq: 0,
            next_key: 1,
            dropped: false,
        }
    }

    pub(crate) fn resource(&self) -> &Resource {
        &self.resource
    }

    pub(crate) fn is_dropped(&self) -> bool {
        self.dropped
    }

    /// Discard all records and mark the table dropped.
    ///
    /// A caller that cloned the table handle before the registry entry was
    /// removed observes the marker and reports the resource as missing.
    pub(crate) fn mark_dropped(&mut self) {
        self.records.clear();
        self.index.clear();
        self.tombstones.clear();
        self.dropped = true;
    }

    /// Number of live records.
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn key_status(&self, key: &str) -> KeyStatus {
        if self.index.contains_key(key) {
            KeyStatus::Live
        } else if self.tombstones.contains(key) {
            KeyStatus::Deleted
        } else {
            KeyStatus::NeverIssued
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).and_then(|seq| self.records.get(seq))
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        let seq = *self.index.get(key)?;
        self.records.get_mut(&seq)
    }

    /// Live records in insertion order.
    pub(crate) fn iter_live(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Generate the next primary key for this resource.
    pub(crate) fn generate_key(&mut self) -> Value {
        match self.resource.key_kind {
            KeyKind::Int => {
                let key = self.next_key;
                self.next_key += 1;
                Value::from(key)
            }
            KeyKind::Uuid => Value::from(Uuid::new_v4().to_string()),
        }
    }

    /// Insert a record under a key the caller has already validated as free.
    ///
    /// Re-using a tombstoned key resurrects it: the tombstone is cleared and
    /// the record re-enters at the end of the insertion order.
    pub(crate) fn insert(&mut self, key: String, record: Record) {
        self.tombstones.remove(&key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(key, seq);
        self.records.insert(seq, record);
    }

    /// Remove the live record under `key`, leaving a tombstone.
    ///
    /// Returns false if no live record holds the key.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(seq) => {
                self.records.remove(&seq);
                self.tombstones.insert(key.to_string());
                true
            }
            None => false,
        }
    }

    /// Serializable snapshot of this table.
    pub(crate) fn to_state(&self) -> TableState {
        let mut tombstones: Vec<String> = self.tombstones.iter().cloned().collect();
        tombstones.sort();

        TableState {
            resource: self.resource.clone(),
            records: self.records.values().cloned().collect(),
            tombstones,
            next_key: self.next_key,
        }
    }

    /// Rebuild a table from a serialized state.
    ///
    /// Records re-enter in the order they were saved; the primary-key index is
    /// rebuilt and checked for uniqueness.
    pub(crate) fn from_state(state: TableState) -> Result<Self, String> {
        let mut table = ResourceTable::new(state.resource);
        table.next_key = state.next_key;

        let pk_field = table.resource.primary_key.clone();
        for record in state.records {
            let key = record
                .get(&pk_field)
                .and_then(key_index_string)
                .ok_or_else(|| {
                    format!(
                        "record in '{}' is missing a usable '{}' key",
                        table.resource.name, pk_field
                    )
                })?;

            if table.index.contains_key(&key) {
                return Err(format!(
                    "duplicate primary key '{}' in '{}'",
                    key, table.resource.name
                ));
            }

            table.insert(key, record);
        }

        for key in state.tombstones {
            if !table.index.contains_key(&key) {
                table.tombstones.insert(key);
            }
        }

        Ok(table)
    }
}

/// Serialized form of a resource table.
///
/// Preserves the descriptor, the live records in insertion order, the
/// tombstoned keys, and the generated-key counter, which is everything needed
/// to rebuild the table with its invariants intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    /// The resource descriptor
    pub resource: Resource,
    /// Live records in insertion order
    pub records: Vec<Record>,
    /// Canonical keys of deleted records
    pub tombstones: Vec<String>,
    /// Next generated integer key
    pub next_key: u64,
}
