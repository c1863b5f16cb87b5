//! mockstore - a schema-less, concurrent object store for mock REST servers
//!
//! The store persists arbitrary JSON-like records per declared resource,
//! assigns primary keys, navigates parent/child relationships for nested
//! routes, and returns a closed set of structured errors. It is safe for
//! concurrent use by request-dispatching workers; the HTTP layer, schema
//! validation, and authentication live in the consuming server.

pub mod observability;
pub mod resource;
pub mod snapshot;
pub mod store;
