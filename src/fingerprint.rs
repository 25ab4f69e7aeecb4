//! Content fingerprints for composed artifacts.
//!
//! The input is rendered as canonical JSON (object keys sorted, no
//! whitespace) before hashing, so equal content always yields the same
//! fingerprint regardless of how the value was assembled.

use sha2::{Digest, Sha256};

/// SHA-256 of the canonical JSON form of `value`, hex encoded.
pub fn content_hash(value: &serde_json::Value) -> String {
    // serde_json::Value keeps object keys in a BTreeMap, so to_string is canonical
    let canonical = value.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short artifact id: `art_` followed by the first 16 hex chars of the content hash.
pub fn artifact_id(value: &serde_json::Value) -> String {
    format!("art_{}", &content_hash(value)[..16])
}
