//! Stable cache-key hashing.
//!
//! Keys hash only the semantically relevant inputs, never the raw
//! request, so formatting differences in upstream text still hit the
//! cache.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA256 over the JSON form of a serializable value.
///
/// Returns a 64-character lowercase hexadecimal string.
///
/// # Errors
/// Returns an error if the value cannot be serialized to JSON.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Cache key for a generated-SQL entry.
///
/// Question text is whitespace-normalized and lowercased; column, table,
/// and value signatures are sorted. Two requests that differ only in
/// formatting or entity order produce the same key. `intent` must be the
/// full canonical serialization of the intent, not just its kind:
/// requests that differ in top-N, time scope, filters, or aggregations
/// produce different SQL and must never share an entry.
pub fn sql_cache_key(
    question: &str,
    intent: &str,
    columns: &[String],
    tables: &[String],
    values: &[String],
) -> Result<String, serde_json::Error> {
    let normalized: String = question.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut columns = columns.to_vec();
    columns.sort_unstable();
    let mut tables = tables.to_vec();
    tables.sort_unstable();
    let mut values = values.to_vec();
    values.sort_unstable();
    compute_hash(&(normalized.to_lowercase(), intent, columns, tables, values))
}
