//! Resource descriptor subsystem
//!
//! Resources describe the collections a mock REST server exposes: a unique
//! name, an ordered field list, the primary-key field, and an optional parent
//! relationship used by nested routes. Descriptors are registered with the
//! store before traffic and are immutable until dropped.

mod types;

pub use types::{FieldDef, FieldType, KeyKind, KeyPolicy, ParentLink, Resource, ResourceError};
