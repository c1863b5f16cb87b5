//! Snapshot error types
//!
//! Error codes:
//! - SNAPSHOT_FAILED (creation/restore aborted)
//! - SNAPSHOT_IO (file read/write failure)
//! - SNAPSHOT_MANIFEST (manifest generation/parse failure)
//! - SNAPSHOT_CORRUPTION (checksum mismatch or malformed state)
//!
//! Snapshot failures never corrupt the live store: creation reads a
//! consistent cut, restore builds a fresh store or nothing.

use std::fmt;
use std::io;

/// Snapshot-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotErrorCode {
    /// General snapshot failure
    SnapshotFailed,
    /// I/O failure during snapshot
    SnapshotIo,
    /// Manifest generation/parse failure
    SnapshotManifest,
    /// Checksum mismatch or malformed state file
    SnapshotCorruption,
}

impl SnapshotErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotErrorCode::SnapshotFailed => "SNAPSHOT_FAILED",
            SnapshotErrorCode::SnapshotIo => "SNAPSHOT_IO",
            SnapshotErrorCode::SnapshotManifest => "SNAPSHOT_MANIFEST",
            SnapshotErrorCode::SnapshotCorruption => "SNAPSHOT_CORRUPTION",
        }
    }
}

impl fmt::Display for SnapshotErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Snapshot error with full context.
#[derive(Debug)]
pub struct SnapshotError {
    /// Error code
    code: SnapshotErrorCode,
    /// Human-readable message
    message: String,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl SnapshotError {
    /// Create a general snapshot failure
    pub fn snapshot_failed(message: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::SnapshotFailed,
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with path context
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: SnapshotErrorCode::SnapshotIo,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a manifest error
    pub fn manifest_error(message: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::SnapshotManifest,
            message: message.into(),
            source: None,
        }
    }

    /// Create a manifest error with IO source
    pub fn manifest_io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: SnapshotErrorCode::SnapshotManifest,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a corruption error
    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::SnapshotCorruption,
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SnapshotErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;
