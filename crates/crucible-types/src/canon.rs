//! Canonical serialization of JSON-compatible values and content hashing.
//!
//! Canonical form: object keys sorted lexicographically, arrays keep their
//! order, numbers use serde_json's shortest round-trip representation,
//! strings are UTF-8. The hash of that byte form is SHA-256, hex-encoded.

use serde_json::Value;

/// Hex-encoded SHA-256 digest. Distinct from `BlobHash` only in name — both
/// are 64 lowercase hex characters — kept separate so call sites read clearly.
pub type Hash = String;

/// Recursively sorts object keys so two semantically-equal values serialize
/// to byte-identical output regardless of field insertion order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serializes a JSON-compatible value to its canonical byte form.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let sorted = canonicalize(value);
    // serde_json's default Display already emits the shortest round-trip
    // numeric form and has no insignificant whitespace.
    serde_json::to_vec(&sorted).expect("Value serialization is infallible")
}

/// Serializes any `Serialize` value to canonical bytes by first going
/// through `serde_json::Value`.
pub fn canonical_bytes_of<T: serde::Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    Ok(canonical_bytes(&v))
}

/// SHA-256 of raw bytes, hex-encoded.
pub fn sha256_hex(bytes: &[u8]) -> Hash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Canonical-JSON hash of a JSON-compatible value.
pub fn canonical_hash(value: &Value) -> Hash {
    sha256_hex(&canonical_bytes(value))
}

/// Canonical-JSON hash of any serializable value.
pub fn canonical_hash_of<T: serde::Serialize>(value: &T) -> serde_json::Result<Hash> {
    Ok(sha256_hex(&canonical_bytes_of(value)?))
}

/// Deterministic digest over an ordered list of content hashes, used to
/// compute a job's `inputsHash` from its resolved inputs' content hashes.
pub fn digest_of_hashes<'a>(hashes: impl IntoIterator<Item = &'a str>) -> Hash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for h in hashes {
        hasher.update(h.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
