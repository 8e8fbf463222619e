//! JSON Lines batch encoding and object naming

use crate::record::ProductRecord;
use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Serializes records as JSON Lines
///
/// One record per line, fields in [`ProductRecord`] declaration order, lines
/// joined by `\n` with no trailing newline.
pub fn serialize_batch(records: &[ProductRecord]) -> Result<String, serde_json::Error> {
    let lines = records
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

/// Parses a JSON Lines payload back into records
///
/// Blank lines are skipped.
pub fn parse_batch(payload: &str) -> Result<Vec<ProductRecord>, serde_json::Error> {
    payload
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}

/// SHA-256 of the payload, hex encoded
pub fn content_hash(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hex::encode(hasher.finalize())
}

/// Builds `<source>/<YYYY>/<MM>/<DD>/<hash>-<uuid>.jsonl`
///
/// The random suffix keeps two flushes of identical content apart.
pub fn object_key(source: &str, now: DateTime<Utc>, hash: &str) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/{}-{}.jsonl",
        source,
        now.year(),
        now.month(),
        now.day(),
        hash,
        Uuid::new_v4()
    )
}
