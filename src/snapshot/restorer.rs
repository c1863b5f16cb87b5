//! Snapshot restore
//!
//! Restore order: read the manifest, verify the state file's checksum
//! against it, parse, then rebuild the store. Nothing is returned unless
//! every step succeeds, so a restored store always satisfies the key
//! uniqueness and ordering invariants.

use std::fs;
use std::path::Path;

use crate::observability::Logger;
use crate::store::{Store, TableState};

use super::checksum::{parse_checksum, verify_checksum};
use super::creator::{MANIFEST_FILE, STATE_FILE};
use super::errors::{SnapshotError, SnapshotResult};
use super::manifest::{SnapshotManifest, MANIFEST_FORMAT_VERSION};

/// Rebuilds stores from snapshot directories.
pub struct SnapshotRestorer;

impl SnapshotRestorer {
    /// Restore a store from the snapshot in `dir`.
    pub fn restore(dir: &Path) -> SnapshotResult<Store> {
        let manifest = SnapshotManifest::read_from_file(&dir.join(MANIFEST_FILE))?;

        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(SnapshotError::manifest_error(format!(
                "unsupported manifest format version {}",
                manifest.format_version
            )));
        }

        let expected = parse_checksum(&manifest.state_checksum).ok_or_else(|| {
            SnapshotError::manifest_error(format!(
                "unparseable state checksum '{}'",
                manifest.state_checksum
            ))
        })?;

        let state_path = dir.join(STATE_FILE);
        let bytes = fs::read(&state_path).map_err(|e| {
            SnapshotError::io_error(
                format!("failed to read state file: {}", state_path.display()),
                e,
            )
        })?;

        if !verify_checksum(&bytes, expected) {
            return Err(SnapshotError::corruption(format!(
                "checksum mismatch for {}",
                state_path.display()
            )));
        }

        let states: Vec<TableState> = serde_json::from_slice(&bytes).map_err(|e| {
            SnapshotError::corruption(format!("state file is not valid JSON: {}", e))
        })?;

        if states.len() != manifest.resource_count {
            return Err(SnapshotError::corruption(format!(
                "manifest declares {} resources, state file holds {}",
                manifest.resource_count,
                states.len()
            )));
        }

        let store = Store::import_state(states).map_err(|e| {
            SnapshotError::corruption(format!("state violates store invariants: {}", e))
        })?;

        let resources = manifest.resource_count.to_string();
        Logger::info(
            "SNAPSHOT_RESTORED",
            &[
                ("resources", resources.as_str()),
                ("snapshot_id", manifest.snapshot_id.as_str()),
            ],
        );
        Ok(store)
    }
}
