//! Request fingerprinting
//!
//! A fingerprint content-addresses a remote request by its operation name and
//! semantic parameters. Two work items with the same fingerprint are the same
//! request as far as the remote API is concerned.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Lowercase hex SHA-256 of a canonical request encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed digest
    pub fn from_hex<S: Into<String>>(hex: S) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the fingerprint of `operation` applied to `params`
///
/// Parameters are sorted by name, and every nested JSON object is sorted by
/// key, so insertion order never changes the result. If the iterator yields a
/// name twice the last value wins.
pub fn compute_fingerprint<'a, I>(operation: &str, params: I) -> Fingerprint
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let sorted: BTreeMap<&str, &Value> = params
        .into_iter()
        .map(|(name, value)| (name.as_str(), value))
        .collect();

    let mut canonical = String::with_capacity(64);
    canonical.push_str("{\"operation\":");
    write_string(&mut canonical, operation);
    canonical.push_str(",\"params\":{");
    for (i, (name, value)) in sorted.iter().enumerate() {
        if i > 0 {
            canonical.push(',');
        }
        write_string(&mut canonical, name);
        canonical.push(':');
        write_canonical(&mut canonical, value);
    }
    canonical.push_str("}}");

    let digest = Sha256::digest(canonical.as_bytes());
    Fingerprint(hex::encode(digest))
}

/// Canonical JSON: no whitespace, object keys in byte order
fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, nested)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_canonical(out, nested);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, nested) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, nested);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
    // Display on a JSON string value yields the escaped, quoted form
    out.push_str(&Value::String(s.to_string()).to_string());
}
