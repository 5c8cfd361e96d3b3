//! xxHash-based fingerprints for compiled SQL.
//!
//! Fingerprints are deterministic 64-bit hashes of a relation's SQL text.
//! They name generated helper columns (the deduplicate ranking column) so
//! that the same input always renders byte-identical SQL.

use xxhash_rust::xxh64;

const SEED: u64 = 0x517cc1b727220a95;

/// Compute a 64-bit fingerprint of a SQL string.
pub fn sql_fingerprint(sql: &str) -> u64 {
    xxh64::xxh64(sql.as_bytes(), SEED)
}

/// Compute a fingerprint over several text parts.
///
/// Parts are joined with a record separator so that `["ab", "c"]` and
/// `["a", "bc"]` hash differently.
pub fn multi_fingerprint<S: AsRef<str>>(parts: &[S]) -> u64 {
    let mut combined = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            combined.push('\x1E');
        }
        combined.push_str(part.as_ref());
    }
    sql_fingerprint(&combined)
}

/// Render a fingerprint as 16 lowercase hex digits.
pub fn fingerprint_hex(fingerprint: u64) -> String {
    format!("{fingerprint:016x}")
}
