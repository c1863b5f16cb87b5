//! Snapshot subsystem
//!
//! Point-in-time durability for the store: a snapshot directory holds the
//! serialized table states plus a checksummed manifest, and restore rebuilds
//! a store with all invariants intact. Durability is opt-in; the store itself
//! is purely in-memory.

mod checksum;
mod creator;
mod errors;
mod manifest;
mod restorer;

pub use checksum::{compute_checksum, format_checksum, parse_checksum, verify_checksum};
pub use creator::{SnapshotCreator, MANIFEST_FILE, STATE_FILE};
pub use errors::{SnapshotError, SnapshotErrorCode, SnapshotResult};
pub use manifest::{SnapshotManifest, MANIFEST_FORMAT_VERSION};
pub use restorer::SnapshotRestorer;
