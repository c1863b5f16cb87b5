//! Store change events
//!
//! The store has no back-reference to the server hosting it. Components that
//! need to react to changes (websocket push, cache invalidation, test
//! assertions) register a [`StoreObserver`] and receive typed events after
//! each completed change.
//!
//! Events are dispatched after the write's locks are released, so an observer
//! may call back into the store.

use serde_json::Value;

/// The kinds of observable store changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A resource was registered
    ResourceAdded,
    /// A resource and all its records were dropped
    ResourceDropped,
    /// A record was created
    RecordCreated,
    /// A record was modified
    RecordModified,
    /// A record was deleted
    RecordDeleted,
}

impl ChangeKind {
    /// Returns the event name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::ResourceAdded => "RESOURCE_ADDED",
            ChangeKind::ResourceDropped => "RESOURCE_DROPPED",
            ChangeKind::RecordCreated => "RECORD_CREATED",
            ChangeKind::RecordModified => "RECORD_MODIFIED",
            ChangeKind::RecordDeleted => "RECORD_DELETED",
        }
    }
}

/// A completed store change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Kind of change
    pub kind: ChangeKind,
    /// Resource the change happened in
    pub resource: String,
    /// Primary key of the affected record; None for resource-level changes
    pub primary_key: Option<Value>,
}

impl ChangeEvent {
    /// A resource-level event (added / dropped)
    pub fn resource_level(kind: ChangeKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            primary_key: None,
        }
    }

    /// A record-level event (created / modified / deleted)
    pub fn record_level(kind: ChangeKind, resource: impl Into<String>, primary_key: Value) -> Self {
        Self {
            kind,
            resource: resource.into(),
            primary_key: Some(primary_key),
        }
    }
}

/// Receiver of store change events.
///
/// Implementations must be thread-safe: events arrive from whichever worker
/// thread performed the write.
pub trait StoreObserver: Send + Sync {
    /// Called once per completed change
    fn store_did_change(&self, event: &ChangeEvent);
}
