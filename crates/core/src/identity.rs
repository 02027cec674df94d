//! Stable source-location identity for cross-level correlation.
//!
//! The four rewrite-level snapshots are analyzed independently; entries that
//! describe the same logical call site are tied together by a deterministic
//! key over the file path and start position.

use twox_hash::XxHash3_128;

/// Generate a stable location key from a file path and start position
pub fn location_key(file: &str, line: u32, column: u32) -> String {
    let unique_str = format!("{file}:L{line}:C{column}");
    format!("loc-{:032x}", XxHash3_128::oneshot(unique_str.as_bytes()))
}
