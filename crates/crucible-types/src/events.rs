//! Append-only event records: `InputEvent` and `ArtefactEvent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blob::BlobRef;
use crate::ids::{ArtifactId, InputId};

/// Who (or what) produced an input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditedBy {
    User,
    System,
}

/// Immutable record of an input value at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub id: InputId,
    pub revision: u64,
    /// Canonical-JSON hash of `payload`.
    pub hash: String,
    pub payload: InputPayload,
    pub edited_by: EditedBy,
    pub created_at: DateTime<Utc>,
}

/// An input's value: either an inline JSON scalar/object, or a reference to
/// blob bytes already written into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPayload {
    Value(Value),
    Blob(BlobRef),
}

impl InputPayload {
    /// The value this payload should be hashed against: the JSON value
    /// itself, or the blob's content hash wrapped as a JSON string.
    pub fn hashable(&self) -> Value {
        match self {
            InputPayload::Value(v) => v.clone(),
            InputPayload::Blob(b) => serde_json::json!({"blobHash": b.hash}),
        }
    }

    /// The content hash that feeds into downstream `inputsHash` computation:
    /// the blob's content hash for blobs, or the canonical hash of the value
    /// for scalars.
    pub fn content_hash(&self) -> String {
        match self {
            InputPayload::Value(v) => crate::canon::canonical_hash(v),
            InputPayload::Blob(b) => b.hash.clone(),
        }
    }
}

/// Outcome of a job attempting to produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Structured diagnostics attached to an artifact event, surfaced from a
/// provider response or synthesized by the runner on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Immutable record of a job's attempt to produce one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactEvent {
    pub artefact_id: ArtifactId,
    pub revision: u64,
    /// Digest over the content hashes of the producing job's resolved inputs.
    pub inputs_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<BlobRef>,
    pub status: ArtifactStatus,
    pub produced_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    pub created_at: DateTime<Utc>,
}

impl ArtefactEvent {
    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, ArtifactStatus::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_payload_hash_matches_canonical_hash() {
        let payload = InputPayload::Value(serde_json::json!("sunset"));
        assert_eq!(
            payload.content_hash(),
            crate::canon::canonical_hash(&serde_json::json!("sunset"))
        );
    }

    #[test]
    fn blob_payload_hash_is_blob_hash() {
        let blob = BlobRef::new("deadbeef", 4, "image/png");
        let payload = InputPayload::Blob(blob.clone());
        assert_eq!(payload.content_hash(), "deadbeef");
    }

    #[test]
    fn event_round_trips_through_json() {
        let ev = InputEvent {
            id: InputId::from_name("Theme").unwrap(),
            revision: 1,
            hash: "h".into(),
            payload: InputPayload::Value(serde_json::json!("x")),
            edited_by: EditedBy::User,
            created_at: Utc::now(),
        };
        let s = serde_json::to_string(&ev).unwrap();
        let back: InputEvent = serde_json::from_str(&s).unwrap();
        assert_eq!(ev, back);
    }
}
