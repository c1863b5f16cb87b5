//! The store engine
//!
//! Owns every registered resource and its records, and serves the CRUD and
//! relationship operations a request-dispatching server calls concurrently.
//!
//! Locking model:
//! - a registry lock guards the name -> table map; record operations hold it
//!   only long enough to clone the table handles they need
//! - each table has its own RwLock, so operations on unrelated resources
//!   never block each other
//! - operations that touch two tables (foreign-key checks, child enumeration)
//!   always lock the child before the parent; registration order keeps the
//!   parent graph acyclic, so the ordering is total
//! - a dropped table is cleared under its write lock and left marked, so a
//!   caller racing the drop observes either the intact table or the marker,
//!   never a partial state
//!
//! Lock poisoning surfaces as the Unknown error kind rather than a panic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::observability::{ChangeEvent, ChangeKind, Logger, StoreObserver};
use crate::resource::{KeyPolicy, ParentLink, Resource};

use super::errors::{StoreError, StoreResult};
use super::record::{key_index_string, keys_equal, merge_properties, Record};
use super::table::{KeyStatus, ResourceTable, TableState};

type TableHandle = Arc<RwLock<ResourceTable>>;

/// Registry entry: the immutable descriptor plus the table handle.
///
/// The descriptor is duplicated here so callers can consult it without
/// taking the table lock.
#[derive(Clone)]
struct RegistryEntry {
    resource: Resource,
    table: TableHandle,
}

/// The schema-less object store.
///
/// Safe for concurrent use by multiple request-handling workers.
pub struct Store {
    registry: RwLock<HashMap<String, RegistryEntry>>,
    observers: RwLock<Vec<Arc<dyn StoreObserver>>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Create an empty store with no registered resources.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Resource management
    // ------------------------------------------------------------------

    /// Register a resource.
    ///
    /// The descriptor must be structurally valid, its name unused, and its
    /// parent (if any) already registered — parents before children.
    pub fn add_resource(&self, resource: Resource) -> StoreResult<()> {
        resource.validate_structure().map_err(|e| {
            StoreError::bad_request_with_source(
                format!("invalid resource descriptor '{}'", resource.name),
                e,
            )
        })?;

        let name = resource.name.clone();
        {
            let mut registry = self.write_registry()?;

            if registry.contains_key(&name) {
                return Err(StoreError::bad_request(format!(
                    "resource '{}' is already registered",
                    name
                )));
            }

            if let Some(link) = &resource.parent {
                if link.resource == name {
                    return Err(StoreError::bad_request(format!(
                        "resource '{}' cannot be its own parent",
                        name
                    )));
                }
                if !registry.contains_key(&link.resource) {
                    return Err(StoreError::bad_request(format!(
                        "parent resource '{}' of '{}' is not registered",
                        link.resource, name
                    )));
                }
            }

            let table = Arc::new(RwLock::new(ResourceTable::new(resource.clone())));
            registry.insert(name.clone(), RegistryEntry { resource, table });
        }

        Logger::info("RESOURCE_ADDED", &[("resource", name.as_str())]);
        self.notify(ChangeEvent::resource_level(ChangeKind::ResourceAdded, &name));
        Ok(())
    }

    /// Drop a resource and all its records.
    ///
    /// Dropping an unregistered name is an error, matching every other
    /// operation's treatment of unknown resources.
    pub fn drop_resource(&self, name: &str) -> StoreResult<()> {
        let dropped_records;
        {
            let mut registry = self.write_registry()?;
            let entry = registry.remove(name).ok_or_else(|| {
                StoreError::not_found(format!("no resource named '{}'", name))
            })?;

            // Cleared while still holding the registry lock: a caller that
            // resolved the handle earlier sees the dropped marker, and no new
            // caller can resolve it at all.
            let mut table = write_table(&entry.table)?;
            dropped_records = table.len();
            table.mark_dropped();
        }

        let records = dropped_records.to_string();
        Logger::info(
            "RESOURCE_DROPPED",
            &[("records", records.as_str()), ("resource", name)],
        );
        self.notify(ChangeEvent::resource_level(
            ChangeKind::ResourceDropped,
            name,
        ));
        Ok(())
    }

    /// The registered descriptor for `name`.
    pub fn resource(&self, name: &str) -> StoreResult<Resource> {
        let registry = self.read_registry()?;
        registry
            .get(name)
            .map(|entry| entry.resource.clone())
            .ok_or_else(|| StoreError::not_found(format!("no resource named '{}'", name)))
    }

    /// Names of all registered resources, sorted.
    pub fn resource_names(&self) -> StoreResult<Vec<String>> {
        let registry = self.read_registry()?;
        let mut names: Vec<String> = registry.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    // ------------------------------------------------------------------
    // Read operations
    // ------------------------------------------------------------------

    /// Number of live records in `resource`.
    pub fn count(&self, resource: &str) -> StoreResult<usize> {
        let entry = self.entry(resource)?;
        let table = read_table(&entry.table)?;
        ensure_not_dropped(&table, resource)?;
        Ok(table.len())
    }

    /// The live record holding `primary_key`.
    pub fn get(&self, resource: &str, primary_key: &Value) -> StoreResult<Record> {
        let entry = self.entry(resource)?;
        let key = canonical_key(resource, primary_key)?;

        let table = read_table(&entry.table)?;
        ensure_not_dropped(&table, resource)?;

        match table.key_status(&key) {
            KeyStatus::Live => table
                .get(&key)
                .cloned()
                .ok_or_else(|| StoreError::unknown("live key has no record")),
            KeyStatus::Deleted => Err(deleted_record(resource, &key)),
            KeyStatus::NeverIssued => Err(missing_record(resource, &key)),
        }
    }

    /// All live records of `resource`, in insertion order.
    pub fn get_all(&self, resource: &str) -> StoreResult<Vec<Record>> {
        let entry = self.entry(resource)?;
        let table = read_table(&entry.table)?;
        ensure_not_dropped(&table, resource)?;
        Ok(table.iter_live().cloned().collect())
    }

    /// All live records of `resource` whose foreign key equals `parent_key`
    /// under the parent relationship declared towards `parent`.
    ///
    /// The parent record must be live. A parent with no children yields an
    /// empty vector, not an error.
    pub fn get_children(
        &self,
        resource: &str,
        parent: &str,
        parent_key: &Value,
    ) -> StoreResult<Vec<Record>> {
        let (child_entry, parent_entry) = {
            let registry = self.read_registry()?;
            let child = registry.get(resource).cloned().ok_or_else(|| {
                StoreError::not_found(format!("no resource named '{}'", resource))
            })?;
            let parent_entry = registry.get(parent).cloned().ok_or_else(|| {
                StoreError::not_found(format!("no resource named '{}'", parent))
            })?;
            (child, parent_entry)
        };

        let link = child_entry
            .resource
            .parent
            .as_ref()
            .filter(|link| link.resource == parent)
            .ok_or_else(|| {
                StoreError::bad_request(format!(
                    "resource '{}' declares no parent relationship to '{}'",
                    resource, parent
                ))
            })?;

        let key = canonical_key(parent, parent_key)?;

        // Child before parent, the store-wide two-table lock order
        let child_table = read_table(&child_entry.table)?;
        ensure_not_dropped(&child_table, resource)?;
        let parent_table = read_table(&parent_entry.table)?;
        ensure_not_dropped(&parent_table, parent)?;

        match parent_table.key_status(&key) {
            KeyStatus::Live => {}
            KeyStatus::Deleted => return Err(deleted_record(parent, &key)),
            KeyStatus::NeverIssued => return Err(missing_record(parent, &key)),
        }

        Ok(child_table
            .iter_live()
            .filter(|record| {
                record
                    .get(&link.foreign_key)
                    .and_then(key_index_string)
                    .as_deref()
                    == Some(key.as_str())
            })
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------
    // Write operations
    // ------------------------------------------------------------------

    /// Create a record.
    ///
    /// Assigns the primary key under the `Generated` policy; validates a
    /// caller-supplied key under `CallerSupplied`. When the resource declares
    /// a parent, the properties must carry a foreign key referencing a live
    /// parent record. Returns the stored record including its key.
    pub fn create(&self, resource: &str, properties: Record) -> StoreResult<Record> {
        let (entry, parent_entry) = self.entry_with_parent(resource)?;
        let descriptor = &entry.resource;
        let pk_field = &descriptor.primary_key;

        let supplied_key = match descriptor.key_policy {
            KeyPolicy::Generated => {
                if properties.contains_key(pk_field) {
                    return Err(StoreError::bad_request(format!(
                        "'{}' is assigned by the store for '{}'",
                        pk_field, resource
                    )));
                }
                None
            }
            KeyPolicy::CallerSupplied => {
                let value = properties.get(pk_field).ok_or_else(|| {
                    StoreError::bad_request(format!(
                        "create for '{}' must supply '{}'",
                        resource, pk_field
                    ))
                })?;
                Some((canonical_key(resource, value)?, value.clone()))
            }
        };

        let foreign_key = self.foreign_key_of(descriptor, &properties, true)?;

        let stored;
        let key_value;
        {
            let mut table = write_table(&entry.table)?;
            ensure_not_dropped(&table, resource)?;

            if let Some((key, _)) = &supplied_key {
                if table.key_status(key) == KeyStatus::Live {
                    return Err(StoreError::bad_request(format!(
                        "primary key '{}' already exists in '{}'",
                        key, resource
                    )));
                }
            }

            if let Some((link, fk_value)) = &foreign_key {
                check_parent_reference(resource, parent_entry.as_ref(), link, fk_value)?;
            }

            // All validation has passed: only now is a generated key consumed
            let (key, value) = match supplied_key {
                Some((key, value)) => (key, value),
                None => {
                    let value = table.generate_key();
                    let key = key_index_string(&value)
                        .ok_or_else(|| StoreError::unknown("generated key is not indexable"))?;
                    (key, value)
                }
            };

            let mut record = properties;
            record.insert(pk_field.clone(), value.clone());
            table.insert(key, record.clone());
            stored = record;
            key_value = value;
        }

        let key_str = key_value.to_string();
        Logger::trace(
            "RECORD_CREATED",
            &[("key", key_str.as_str()), ("resource", resource)],
        );
        self.notify(ChangeEvent::record_level(
            ChangeKind::RecordCreated,
            resource,
            key_value,
        ));
        Ok(stored)
    }

    /// Merge `properties` into the record holding `primary_key`.
    ///
    /// The merge is partial: supplied fields replace existing values, other
    /// fields are untouched. The primary key is immutable; a differing
    /// primary-key field in `properties` fails and leaves the record
    /// unchanged. Returns the updated record.
    pub fn modify(
        &self,
        resource: &str,
        primary_key: &Value,
        properties: Record,
    ) -> StoreResult<Record> {
        let (entry, parent_entry) = self.entry_with_parent(resource)?;
        let descriptor = &entry.resource;
        let pk_field = &descriptor.primary_key;
        let key = canonical_key(resource, primary_key)?;

        let mut properties = properties;
        if let Some(supplied) = properties.get(pk_field) {
            if !keys_equal(supplied, primary_key) {
                return Err(StoreError::bad_request(format!(
                    "the primary key of a '{}' record cannot be changed",
                    resource
                )));
            }
            // The stored key value stays authoritative
            properties.remove(pk_field);
        }

        let foreign_key = self.foreign_key_of(descriptor, &properties, false)?;

        let updated;
        let key_value;
        {
            let mut table = write_table(&entry.table)?;
            ensure_not_dropped(&table, resource)?;

            match table.key_status(&key) {
                KeyStatus::Live => {}
                KeyStatus::Deleted => return Err(deleted_record(resource, &key)),
                KeyStatus::NeverIssued => return Err(missing_record(resource, &key)),
            }

            if let Some((link, fk_value)) = &foreign_key {
                check_parent_reference(resource, parent_entry.as_ref(), link, fk_value)?;
            }

            let record = table
                .get_mut(&key)
                .ok_or_else(|| StoreError::unknown("live key has no record"))?;
            merge_properties(record, properties);
            key_value = record.get(pk_field).cloned().unwrap_or(primary_key.clone());
            updated = record.clone();
        }

        let key_str = key_value.to_string();
        Logger::trace(
            "RECORD_MODIFIED",
            &[("key", key_str.as_str()), ("resource", resource)],
        );
        self.notify(ChangeEvent::record_level(
            ChangeKind::RecordModified,
            resource,
            key_value,
        ));
        Ok(updated)
    }

    /// Delete the record holding `primary_key`, leaving a tombstone.
    ///
    /// A second delete of the same key reports the record as already deleted;
    /// a key that was never issued reports not found.
    pub fn delete(&self, resource: &str, primary_key: &Value) -> StoreResult<()> {
        let entry = self.entry(resource)?;
        let pk_field = &entry.resource.primary_key;
        let key = canonical_key(resource, primary_key)?;

        let key_value;
        {
            let mut table = write_table(&entry.table)?;
            ensure_not_dropped(&table, resource)?;

            match table.key_status(&key) {
                KeyStatus::Live => {}
                KeyStatus::Deleted => return Err(deleted_record(resource, &key)),
                KeyStatus::NeverIssued => return Err(missing_record(resource, &key)),
            }

            key_value = table
                .get(&key)
                .and_then(|record| record.get(pk_field))
                .cloned()
                .unwrap_or_else(|| primary_key.clone());
            table.remove(&key);
        }

        let key_str = key_value.to_string();
        Logger::trace(
            "RECORD_DELETED",
            &[("key", key_str.as_str()), ("resource", resource)],
        );
        self.notify(ChangeEvent::record_level(
            ChangeKind::RecordDeleted,
            resource,
            key_value,
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register an observer for store change events.
    pub fn register_observer(&self, observer: Arc<dyn StoreObserver>) -> StoreResult<()> {
        let mut observers = self
            .observers
            .write()
            .map_err(|_| StoreError::unknown("observer registry lock poisoned"))?;
        observers.push(observer);
        Ok(())
    }

    fn notify(&self, event: ChangeEvent) {
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer.store_did_change(&event);
            }
        }
    }

    // ------------------------------------------------------------------
    // State export / import (snapshot support)
    // ------------------------------------------------------------------

    /// Export every table's state, parents before children.
    ///
    /// All table locks are held simultaneously, so the export is a consistent
    /// cut. Locks are taken children-first, matching the write path's
    /// child-then-parent order.
    pub fn export_state(&self) -> StoreResult<Vec<TableState>> {
        let entries: Vec<RegistryEntry> = {
            let registry = self.read_registry()?;
            let mut entries: Vec<RegistryEntry> = registry.values().cloned().collect();
            entries.sort_by(|a, b| a.resource.name.cmp(&b.resource.name));
            dependency_order(entries)
        };

        let mut guards: Vec<RwLockReadGuard<'_, ResourceTable>> =
            Vec::with_capacity(entries.len());
        for entry in entries.iter().rev() {
            guards.push(read_table(&entry.table)?);
        }
        guards.reverse();

        Ok(guards.iter().map(|table| table.to_state()).collect())
    }

    /// Rebuild a store from exported table states.
    ///
    /// States must arrive the way [`Store::export_state`] produces them:
    /// one per resource, primary keys unique. A child whose parent is absent
    /// is accepted, matching a live store after a parent drop.
    pub fn import_state(states: Vec<TableState>) -> StoreResult<Store> {
        let store = Store::new();
        {
            let mut registry = store.write_registry()?;
            for state in states {
                let name = state.resource.name.clone();
                if registry.contains_key(&name) {
                    return Err(StoreError::bad_request(format!(
                        "duplicate resource '{}' in imported state",
                        name
                    )));
                }

                let resource = state.resource.clone();
                let table = ResourceTable::from_state(state)
                    .map_err(StoreError::bad_request)?;
                registry.insert(
                    name,
                    RegistryEntry {
                        resource,
                        table: Arc::new(RwLock::new(table)),
                    },
                );
            }
        }
        Ok(store)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read_registry(
        &self,
    ) -> StoreResult<RwLockReadGuard<'_, HashMap<String, RegistryEntry>>> {
        self.registry
            .read()
            .map_err(|_| StoreError::unknown("resource registry lock poisoned"))
    }

    fn write_registry(
        &self,
    ) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, RegistryEntry>>> {
        self.registry
            .write()
            .map_err(|_| StoreError::unknown("resource registry lock poisoned"))
    }

    fn entry(&self, resource: &str) -> StoreResult<RegistryEntry> {
        let registry = self.read_registry()?;
        registry.get(resource).cloned().ok_or_else(|| {
            StoreError::not_found(format!("no resource named '{}'", resource))
        })
    }

    /// Resolve a resource entry and, when it declares a parent, the parent's
    /// entry — in one registry read, before any table lock is taken.
    fn entry_with_parent(
        &self,
        resource: &str,
    ) -> StoreResult<(RegistryEntry, Option<RegistryEntry>)> {
        let registry = self.read_registry()?;
        let entry = registry.get(resource).cloned().ok_or_else(|| {
            StoreError::not_found(format!("no resource named '{}'", resource))
        })?;
        let parent = entry
            .resource
            .parent
            .as_ref()
            .and_then(|link| registry.get(&link.resource).cloned());
        Ok((entry, parent))
    }

    /// Extract and canonicalize the foreign key from `properties` when the
    /// descriptor declares a parent.
    ///
    /// On create the foreign key is mandatory; on modify it is validated only
    /// when supplied.
    fn foreign_key_of(
        &self,
        descriptor: &Resource,
        properties: &Record,
        required: bool,
    ) -> StoreResult<Option<(ParentLink, String)>> {
        let Some(link) = &descriptor.parent else {
            return Ok(None);
        };

        match properties.get(&link.foreign_key) {
            Some(value) => {
                let key = key_index_string(value).ok_or_else(|| {
                    StoreError::bad_request(format!(
                        "'{}' on '{}' must be a string or a number",
                        link.foreign_key, descriptor.name
                    ))
                })?;
                Ok(Some((link.clone(), key)))
            }
            None if required => Err(StoreError::bad_request(format!(
                "records of '{}' must reference a '{}' record via '{}'",
                descriptor.name, link.resource, link.foreign_key
            ))),
            None => Ok(None),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Order entries so parents precede their children.
///
/// A child whose parent is not present (dropped) is treated as a root.
fn dependency_order(entries: Vec<RegistryEntry>) -> Vec<RegistryEntry> {
    let present: HashSet<String> = entries.iter().map(|e| e.resource.name.clone()).collect();

    let mut emitted = HashSet::new();
    let mut ordered = Vec::with_capacity(entries.len());
    let mut remaining = entries;

    while !remaining.is_empty() {
        let mut progressed = false;
        let mut deferred = Vec::new();

        for entry in remaining {
            let ready = match &entry.resource.parent {
                Some(link) => !present.contains(&link.resource) || emitted.contains(&link.resource),
                None => true,
            };
            if ready {
                emitted.insert(entry.resource.name.clone());
                ordered.push(entry);
                progressed = true;
            } else {
                deferred.push(entry);
            }
        }

        remaining = deferred;
        if !progressed {
            // Registration rules forbid cycles; do not loop if state disagrees
            ordered.extend(remaining);
            break;
        }
    }

    ordered
}

fn read_table(handle: &TableHandle) -> StoreResult<RwLockReadGuard<'_, ResourceTable>> {
    handle
        .read()
        .map_err(|_| StoreError::unknown("resource table lock poisoned"))
}

fn write_table(handle: &TableHandle) -> StoreResult<RwLockWriteGuard<'_, ResourceTable>> {
    handle
        .write()
        .map_err(|_| StoreError::unknown("resource table lock poisoned"))
}

fn ensure_not_dropped(table: &ResourceTable, resource: &str) -> StoreResult<()> {
    if table.is_dropped() {
        return Err(StoreError::not_found(format!(
            "no resource named '{}'",
            resource
        )));
    }
    Ok(())
}

fn canonical_key(resource: &str, key: &Value) -> StoreResult<String> {
    key_index_string(key).ok_or_else(|| {
        StoreError::bad_request(format!(
            "a primary key for '{}' must be a string or a number",
            resource
        ))
    })
}

/// Validate that a foreign key references a live parent record.
///
/// Called with the child table lock held; takes the parent read lock,
/// preserving the child-then-parent order.
fn check_parent_reference(
    resource: &str,
    parent_entry: Option<&RegistryEntry>,
    link: &ParentLink,
    fk_value: &str,
) -> StoreResult<()> {
    let entry = parent_entry.ok_or_else(|| {
        StoreError::bad_request(format!(
            "parent resource '{}' of '{}' is not registered",
            link.resource, resource
        ))
    })?;

    let parent_table = read_table(&entry.table)?;
    if parent_table.is_dropped() || parent_table.key_status(fk_value) != KeyStatus::Live {
        return Err(StoreError::bad_request(format!(
            "'{}' = '{}' does not reference a live '{}' record",
            link.foreign_key, fk_value, link.resource
        )));
    }
    Ok(())
}

fn missing_record(resource: &str, key: &str) -> StoreError {
    StoreError::not_found(format!("no record '{}' in '{}'", key, resource))
}

fn deleted_record(resource: &str, key: &str) -> StoreError {
    StoreError::already_deleted(format!(
        "record '{}' in '{}' was deleted",
        key, resource
    ))
}
