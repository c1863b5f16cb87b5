//! CRC32 checksums for snapshot files
//!
//! The state file's checksum is recorded in the manifest as
//! `crc32:XXXXXXXX` and verified before any restore.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

/// Formats a checksum the way the manifest records it.
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses a `crc32:XXXXXXXX` manifest checksum.
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let hex = formatted.strip_prefix("crc32:")?;
    u32::from_str_radix(hex, 16).ok()
}
