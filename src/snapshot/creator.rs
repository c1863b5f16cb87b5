//! Snapshot creation
//!
//! A snapshot directory holds two files:
//! - `store.json` — every table's state, parents before children
//! - `manifest.json` — the authoritative descriptor with the state checksum
//!
//! The state is exported as a consistent cut and both files are fsynced, so
//! a snapshot directory with a matching checksum is always restorable.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::observability::Logger;
use crate::store::Store;

use super::checksum::{compute_checksum, format_checksum};
use super::errors::{SnapshotError, SnapshotResult};
use super::manifest::SnapshotManifest;

/// File name of the serialized table states.
pub const STATE_FILE: &str = "store.json";

/// File name of the snapshot manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Writes point-in-time snapshots of a store.
pub struct SnapshotCreator;

impl SnapshotCreator {
    /// Create a snapshot of `store` in `dir`, creating the directory if
    /// needed. Returns the written manifest.
    pub fn create(store: &Store, dir: &Path) -> SnapshotResult<SnapshotManifest> {
        let dir_display = dir.display().to_string();
        Logger::info("SNAPSHOT_START", &[("path", dir_display.as_str())]);

        let states = store.export_state().map_err(|e| {
            SnapshotError::snapshot_failed(format!("state export failed: {}", e))
        })?;

        let bytes = serde_json::to_vec_pretty(&states).map_err(|e| {
            SnapshotError::snapshot_failed(format!("state serialization failed: {}", e))
        })?;

        fs::create_dir_all(dir).map_err(|e| {
            SnapshotError::io_error(
                format!("failed to create snapshot directory: {}", dir.display()),
                e,
            )
        })?;

        let state_path = dir.join(STATE_FILE);
        let mut file = File::create(&state_path).map_err(|e| {
            SnapshotError::io_error(
                format!("failed to create state file: {}", state_path.display()),
                e,
            )
        })?;
        file.write_all(&bytes).map_err(|e| {
            SnapshotError::io_error(
                format!("failed to write state file: {}", state_path.display()),
                e,
            )
        })?;
        file.sync_all().map_err(|e| {
            SnapshotError::io_error(
                format!("failed to fsync state file: {}", state_path.display()),
                e,
            )
        })?;

        let now = Utc::now();
        let manifest = SnapshotManifest::new(
            now.format("%Y%m%dT%H%M%SZ").to_string(),
            now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            format_checksum(compute_checksum(&bytes)),
            states.len(),
        );
        manifest.write_to_file(&dir.join(MANIFEST_FILE))?;

        let resources = manifest.resource_count.to_string();
        Logger::info(
            "SNAPSHOT_COMPLETE",
            &[
                ("path", dir_display.as_str()),
                ("resources", resources.as_str()),
                ("snapshot_id", manifest.snapshot_id.as_str()),
            ],
        );
        Ok(manifest)
    }
}
