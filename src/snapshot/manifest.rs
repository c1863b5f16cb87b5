//! Snapshot manifest structure and serialization
//!
//! `manifest.json` is the authoritative snapshot descriptor:
//!
//! ```json
//! {
//!   "snapshot_id": "20260806T113000Z",
//!   "created_at": "2026-08-06T11:30:00Z",
//!   "state_checksum": "crc32:deadbeef",
//!   "resource_count": 2,
//!   "format_version": 1
//! }
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{SnapshotError, SnapshotResult};

/// Manifest format version written by this crate.
pub const MANIFEST_FORMAT_VERSION: u8 = 1;

/// Snapshot manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotManifest {
    /// Snapshot ID in RFC3339 basic format (YYYYMMDDTHHMMSSZ)
    pub snapshot_id: String,

    /// Creation timestamp in RFC3339 format (YYYY-MM-DDTHH:MM:SSZ)
    pub created_at: String,

    /// CRC32 checksum of the state file (format: "crc32:XXXXXXXX")
    pub state_checksum: String,

    /// Number of resource tables in the state file
    pub resource_count: usize,

    /// Manifest format version
    pub format_version: u8,
}

impl SnapshotManifest {
    /// Creates a new snapshot manifest.
    pub fn new(
        snapshot_id: impl Into<String>,
        created_at: impl Into<String>,
        state_checksum: impl Into<String>,
        resource_count: usize,
    ) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            created_at: created_at.into(),
            state_checksum: state_checksum.into(),
            resource_count,
            format_version: MANIFEST_FORMAT_VERSION,
        }
    }

    /// Serializes the manifest to pretty-printed JSON.
    pub fn to_json(&self) -> SnapshotResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SnapshotError::manifest_error(format!("failed to serialize manifest: {}", e))
        })
    }

    /// Deserializes a manifest from JSON.
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SnapshotError::manifest_error(format!("failed to parse manifest: {}", e)))
    }

    /// Writes the manifest to a file with fsync.
    pub fn write_to_file(&self, path: &Path) -> SnapshotResult<()> {
        let json = self.to_json()?;

        let mut file = File::create(path).map_err(|e| {
            SnapshotError::manifest_io_error(
                format!("failed to create manifest file: {}", path.display()),
                e,
            )
        })?;

        file.write_all(json.as_bytes()).map_err(|e| {
            SnapshotError::manifest_io_error(
                format!("failed to write manifest: {}", path.display()),
                e,
            )
        })?;

        file.sync_all().map_err(|e| {
            SnapshotError::manifest_io_error(
                format!("failed to fsync manifest: {}", path.display()),
                e,
            )
        })?;

        Ok(())
    }

    /// Reads a manifest from a file.
    pub fn read_from_file(path: &Path) -> SnapshotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SnapshotError::manifest_io_error(
                format!("failed to read manifest: {}", path.display()),
                e,
            )
        })?;

        Self::from_json(&content)
    }
}
